#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 RSNA 肺炎检测格式的胸部 X 光 (CXR) 数据集的结构化信息和训练数据生成算法.
//!
//! 该 crate 目前仅提供 `safe` 接口, 并且所有操作都是同步且单线程的.
//!
//! # 注意
//!
//! 1. 该 crate 主要负责处理 RSNA 肺炎检测数据 (DICOM + 标注 csv),
//!   没有对其它源的数据进行直接适配 (但如果新数据按照同样模式进行组织, 也可以工作).
//! 2. 标注几何均以固定的 1024x1024 参考画布表达, 与输出图像尺寸无关.
//! 3. 在非期望情况下 (如索引越界), 程序会直接 panic, 而不会导致内存错误.
//!   As what Rust promises.
//!
//! # 开发计划
//!
//! ### DICOM 解码、规范化与 npy 缓存 ✅
//!
//! 单病例 DICOM 文件解码为单通道灰度图, 以平滑滤波降采样至固定输出尺寸,
//! 规范化到 `[0, 1]` 的 `f32`, 并持久化 `.npy` 缓存以避免重复解码.
//!
//! 实现位于 `cxr-berry/src/data`.
//!
//! ### 平移增强 ✅
//!
//! 对图像做 (dx, dy) 整数像素的环形平移 (wrap-around), 并保证标注几何
//! 与图像使用同一偏移量.
//!
//! 实现位于 `cxr-berry/src/data/augment.rs`.
//!
//! ### 两轴多热网格标签编码 ✅
//!
//! 把一个病例的若干边界框编码为长度 `2S` 的多热向量 (前 `S` 位为 x 轴,
//! 后 `S` 位为 y 轴), 多框之间按位取或. 该编码是有损的.
//!
//! 实现位于 `cxr-berry/src/grid/encode.rs`.
//!
//! ### 峰值检测与边界框重建 ✅
//!
//! 从网格向量的激活游程识别峰值 (过滤过小的游程), 并由 x 轴峰值与 y
//! 轴激活位联合重建像素空间边界框 (过滤过小的框).
//!
//! 实现位于 `cxr-berry/src/grid/{runs, decode}.rs`.
//!
//! ### 类平衡采样 ✅
//!
//! 以目标正类比例从标注表中无放回地抽取病例, 重试预算耗尽时静默退化.
//!
//! 实现位于 `cxr-berry/src/dataset/sampler.rs`.
//!
//! ### 批量装配 ✅
//!
//! 生成训练批次 (图像 + 标签), 单病例样本, 以及推理用全量输入.
//!
//! 实现位于 `cxr-berry/src/dataset/batch.rs`.

/// 二维索引 (高, 宽), 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

pub mod consts;

mod config;

pub use config::PipelineCfg;

/// 单病例图像数据结构.
mod data;

pub use data::{cache_path, dcm_path, roll2d, LoadImageError, PixelShift, StudyImage};

pub mod grid;

pub use grid::{decode_boxes, encode_study, has_detection, GridVec, PxBox, RefBox};

pub mod dataset;

pub use dataset::{
    BalancedDraw, BalancedSampler, Batch, LabelRecord, LabelTable, LabelTableError, StudyGenerator,
};

pub mod prelude;
