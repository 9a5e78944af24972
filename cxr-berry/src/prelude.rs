//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::config::PipelineCfg;

pub use crate::data::{cache_path, dcm_path, roll2d, LoadImageError, PixelShift, StudyImage};

pub use crate::grid::{
    decode_boxes, encode_study, has_detection, GridVec, PxBox, RefBox,
};

pub use crate::dataset::{
    home_dataset_dir, home_dataset_dir_with, BalancedDraw, BalancedSampler, Batch, LabelRecord,
    LabelTable, LabelTableError, StudyGenerator,
};

pub use crate::consts::{ACTIVE_THRESHOLD, REF_CANVAS};
