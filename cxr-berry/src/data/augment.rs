//! 平移增强.

use ndarray::{Array2, ArrayView2};
use rand::Rng;

/// 一次样本抽取所用的整数像素平移偏移 (dx, dy), 以输出图像像素为单位.
///
/// 同一病例的图像与标注几何必须使用同一个偏移, 否则两者将失去一致性.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelShift {
    /// 水平偏移. 正值向右.
    pub dx: i64,

    /// 垂直偏移. 正值向下.
    pub dy: i64,
}

impl PixelShift {
    /// 零偏移. 增强被禁用时使用.
    pub const NONE: PixelShift = PixelShift { dx: 0, dy: 0 };

    /// 独立均匀地从 `[-max_offset, +max_offset]` 抽取一个偏移.
    ///
    /// `max_offset` 为负时程序 panic.
    pub fn sample<R: Rng>(rng: &mut R, max_offset: i64) -> PixelShift {
        assert!(max_offset >= 0, "max_offset 必须非负");
        if max_offset == 0 {
            return Self::NONE;
        }
        Self {
            dx: rng.gen_range(-max_offset..=max_offset),
            dy: rng.gen_range(-max_offset..=max_offset),
        }
    }

    /// 是否为零偏移.
    #[inline]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// 对二维数组做环形平移: 行向下移动 `dy`, 列向右移动 `dx`,
/// 在数组边界处回绕 (不做零填充), 因此不丢失任何信息且形状不变.
///
/// 零偏移时等价于逐元素拷贝.
pub fn roll2d(img: ArrayView2<'_, f32>, shift: PixelShift) -> Array2<f32> {
    let (h, w) = img.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let src_r = (r as i64 - shift.dy).rem_euclid(h as i64) as usize;
        let src_c = (c as i64 - shift.dx).rem_euclid(w as i64) as usize;
        img[(src_r, src_c)]
    })
}
