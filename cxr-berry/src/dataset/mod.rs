//! 数据集级操作: 标注表、类平衡采样与批量装配.

use std::path::{Path, PathBuf};

mod batch;
mod labels;
mod sampler;

pub use batch::{Batch, StudyGenerator};
pub use labels::{LabelRecord, LabelTable, LabelTableError};
pub use sampler::{BalancedDraw, BalancedSampler};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定后续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}
