//! 数据集缓存预热与类平衡自检工具.
//!
//! 用法: `prep [数据目录] [标注 csv]`.
//!
//! 数据目录缺省时依次尝试 `$CXR_TRAIN_DIR` 和 `~/dataset/train`.
//! 不提供标注 csv 时按目录下的 `.dcm` 文件生成合成阴性标注表.

use std::env;
use std::path::PathBuf;

use cxr_berry::prelude::*;

/// 获取训练数据基本路径.
///
/// 1. 若环境变量 `$CXR_TRAIN_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/train`.
fn train_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("CXR_TRAIN_DIR") {
        PathBuf::from(d)
    } else {
        home_dataset_dir_with(["train"]).unwrap()
    }
}

fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let mut args = env::args().skip(1);
    let dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(train_dir_from_env_or_home);
    let labels = args.next().map(PathBuf::from);
    assert!(dir.is_dir(), "数据目录不存在: {}", dir.display());

    let generator = StudyGenerator::open(&dir, labels.as_deref(), PipelineCfg::default())
        .expect("Loading label table error");
    let table = generator.table();
    println!(
        "labels: {} records ({} positive, {} negative)",
        table.len(),
        table.num_positive(),
        table.num_negative(),
    );

    // 缓存预热. 已有缓存的病例直接命中, 解码失败立即终止.
    let mut done = 0usize;
    for rec in table.records() {
        if let Err(e) = StudyImage::load(&dir, rec.study_id(), generator.cfg(), false) {
            eprintln!("load {} failed: {e:?}", rec.study_id());
            std::process::exit(1);
        }
        done += 1;
        if done % 500 == 0 {
            println!("cached {done}/{}", table.len());
        }
    }
    println!("cache ready: {done} studies");

    // 类平衡自检: 抽一个平衡批并报告两类计数.
    let sampler = BalancedSampler::new(table, 0.5).unwrap();
    let draw = sampler.draw(&mut rand::thread_rng(), 100.min(table.len()));
    println!(
        "balanced draw: {} positive, {} negative",
        draw.num_positive(),
        draw.num_negative(),
    );
}
