//! 边界框到网格标签向量的编码.

use super::GridVec;
use crate::data::PixelShift;
use crate::dataset::LabelRecord;
use crate::PipelineCfg;

/// 把一个病例的全部标注记录编码为一条网格标签向量.
///
/// 阴性记录不贡献激活位; 病例没有任何阳性记录时返回零向量.
/// 多条阳性记录的激活位按位取或, 绝不会把已有的 1 覆盖为 0.
///
/// `shift` 必须是施加在该病例图像上的同一平移偏移: 偏移量先按
/// `1024 / 输出尺寸` 逐轴换算到参考画布, 再叠加到框坐标上,
/// 使标签与增强后的图像保持一致. 编码必须发生在增强 **之后**.
pub fn encode_study<'a, I>(records: I, shift: PixelShift, cfg: &PipelineCfg) -> GridVec
where
    I: IntoIterator<Item = &'a LabelRecord>,
{
    let s = cfg.subdivide();
    let mut grid = GridVec::zeros(cfg.grid_len());

    let dx = shift.dx as f32 * cfg.ref_scale_x();
    let dy = shift.dy as f32 * cfg.ref_scale_y();
    let delta = cfg.bin_width();

    for rec in records {
        let Some(bounds) = rec.bounds() else { continue };
        let b = bounds.shifted(dx, dy);

        for i in 0..s {
            let lo = i as f32 * delta;
            // 闭区间相交判定, 两轴彼此独立.
            if lo + delta >= b.xmin() && lo <= b.xmax() {
                grid[i] = 1.0;
            }
            if lo + delta >= b.ymin() && lo <= b.ymax() {
                grid[s + i] = 1.0;
            }
        }
    }
    grid
}
