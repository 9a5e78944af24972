//! 流水线配置.

use crate::consts::{
    DEFAULT_IMG_SIZE, DEFAULT_MAX_OFFSET, DEFAULT_MIN_PEAK_SIZE, DEFAULT_SUBDIVIDE, REF_CANVAS,
};
use crate::Idx2d;

/// 数据流水线配置, 包含输出图像尺寸、网格细分数、增强偏移上限和最小峰值宽度.
///
/// 该配置是只读的, 在构造各组件时显式传入. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PipelineCfg {
    img_size: Idx2d,
    subdivide: usize,
    max_offset: i64,
    min_peak_size: usize,
}

impl Default for PipelineCfg {
    #[inline]
    fn default() -> Self {
        Self {
            img_size: DEFAULT_IMG_SIZE,
            subdivide: DEFAULT_SUBDIVIDE,
            max_offset: DEFAULT_MAX_OFFSET,
            min_peak_size: DEFAULT_MIN_PEAK_SIZE,
        }
    }
}

impl PipelineCfg {
    /// 构建流水线配置.
    ///
    /// 参数必须在合理范围内 (图像两维均非零, `1 <= subdivide <= 1024`,
    /// `max_offset >= 0`), 否则返回 `None`.
    pub fn new(
        img_size: Idx2d,
        subdivide: usize,
        max_offset: i64,
        min_peak_size: usize,
    ) -> Option<PipelineCfg> {
        let (h, w) = img_size;
        if h == 0 || w == 0 || subdivide == 0 || subdivide > 1024 || max_offset < 0 {
            return None;
        }
        Some(Self {
            img_size,
            subdivide,
            max_offset,
            min_peak_size,
        })
    }

    /// 输出图像尺寸 (高, 宽).
    #[inline]
    pub fn img_size(&self) -> Idx2d {
        self.img_size
    }

    /// 输出图像高度.
    #[inline]
    pub fn height(&self) -> usize {
        self.img_size.0
    }

    /// 输出图像宽度.
    #[inline]
    pub fn width(&self) -> usize {
        self.img_size.1
    }

    /// 每轴网格细分数 `S`.
    #[inline]
    pub fn subdivide(&self) -> usize {
        self.subdivide
    }

    /// 网格标签向量总长度, 即 `2S`.
    #[inline]
    pub fn grid_len(&self) -> usize {
        self.subdivide * 2
    }

    /// 参考画布上单个 bin 的宽度.
    #[inline]
    pub fn bin_width(&self) -> f32 {
        REF_CANVAS / self.subdivide as f32
    }

    /// 平移增强的最大偏移量 (输出图像像素).
    #[inline]
    pub fn max_offset(&self) -> i64 {
        self.max_offset
    }

    /// 最小峰值宽度. 激活游程长度必须严格大于该值才会被认定为峰.
    #[inline]
    pub fn min_peak_size(&self) -> usize {
        self.min_peak_size
    }

    /// 输出图像像素到参考画布的 x 轴缩放比.
    #[inline]
    pub fn ref_scale_x(&self) -> f32 {
        REF_CANVAS / self.width() as f32
    }

    /// 输出图像像素到参考画布的 y 轴缩放比.
    #[inline]
    pub fn ref_scale_y(&self) -> f32 {
        REF_CANVAS / self.height() as f32
    }
}
