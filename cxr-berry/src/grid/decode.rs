//! 网格向量到像素空间边界框的重建.

use itertools::iproduct;

use super::runs::identify_peaks;
use super::PxBox;
use crate::consts::{ACTIVE_THRESHOLD, MIN_BOX_SIDE_PX};
use crate::{Idx2d, PipelineCfg};

/// 从一条网格向量重建输出像素空间中的边界框集合.
///
/// `output` 的前半段为 x 轴激活, 后半段为 y 轴激活; `size` 为目标输出
/// 图像尺寸 (高, 宽). 解码永不失败: 没有合格峰的向量得到空集.
///
/// 算法: 先对 x 轴识别峰 (见 [`identify_peaks`]), 然后对每个 x 峰,
/// 将峰内激活 bin 与 **所有** 激活的 y bin 联立, 以二者 bin 起点的归一化
/// 坐标扩张出一个运行框, 最后缩放到 `size` 并丢弃宽或高不超过 10
/// 像素的噪声框.
///
/// # 注意
///
/// 1. y 轴不做峰值分割: 一个 x 峰内若包含多个 y 峰, 它们会合并为一个
///   更高的框; 两个 x 峰与同一段 y 激活相交时会产生两个框, 彼此不去重.
/// 2. `output.len()` 必须为偶数, 否则程序 panic.
pub fn decode_boxes(output: &[f32], size: Idx2d, cfg: &PipelineCfg) -> Vec<PxBox> {
    assert_eq!(output.len() % 2, 0, "网格向量长度必须为偶数");
    let s = output.len() / 2;
    if s == 0 {
        return vec![];
    }

    let (x_bins, y_bins) = output.split_at(s);
    let x_peaks = identify_peaks(x_bins, cfg.min_peak_size());
    let delta = 1.0 / s as f32;
    let (h, w) = size;

    let mut boxes = Vec::new();
    for peak in 1..=x_peaks.count() {
        // 归一化坐标下的运行框, 由所有命中的 (x, y) bin 起点扩张而来.
        let (mut xmin, mut xmax) = (1.0f32, 0.0f32);
        let (mut ymin, mut ymax) = (1.0f32, 0.0f32);

        for (x, y) in iproduct!(0..s, 0..s) {
            if x_peaks.index_of(x) != peak {
                continue;
            }
            if x_bins[x] >= ACTIVE_THRESHOLD && y_bins[y] >= ACTIVE_THRESHOLD {
                let xv = x as f32 * delta;
                let yv = y as f32 * delta;
                xmin = xmin.min(xv);
                xmax = xmax.max(xv);
                ymin = ymin.min(yv);
                ymax = ymax.max(yv);
            }
        }

        let px = PxBox {
            xmin: (xmin * w as f32) as i64,
            ymin: (ymin * h as f32) as i64,
            xmax: (xmax * w as f32) as i64,
            ymax: (ymax * h as f32) as i64,
        };
        if px.width() > MIN_BOX_SIDE_PX && px.height() > MIN_BOX_SIDE_PX {
            boxes.push(px);
        }
    }
    boxes
}

/// 判断一条网格向量是否包含任何检出: x 轴与 y 轴各存在至少一个激活 bin.
///
/// `output.len()` 必须为偶数, 否则程序 panic.
pub fn has_detection(output: &[f32]) -> bool {
    assert_eq!(output.len() % 2, 0, "网格向量长度必须为偶数");
    let (x_bins, y_bins) = output.split_at(output.len() / 2);
    x_bins.iter().any(|v| *v >= ACTIVE_THRESHOLD) && y_bins.iter().any(|v| *v >= ACTIVE_THRESHOLD)
}
