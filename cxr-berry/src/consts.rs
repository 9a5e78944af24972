//! 通用常量.

/// 文件扩展名.
pub mod ext {
    /// 原始病例图像的 DICOM 文件扩展名.
    pub const DCM: &str = "dcm";

    /// 解码缓存的 numpy 数组文件扩展名.
    pub const CACHE: &str = "npy";
}

/// 标注几何所在的参考画布边长. 标注 csv 中的框坐标均以该画布表达,
/// 与输出图像的实际尺寸无关.
pub const REF_CANVAS: f32 = 1024.0;

/// 默认输出图像尺寸 (高, 宽).
pub const DEFAULT_IMG_SIZE: crate::Idx2d = (128, 128);

/// 默认每轴网格细分数 `S`. 网格标签向量长度为 `2S`.
pub const DEFAULT_SUBDIVIDE: usize = 16;

/// 默认平移增强的最大偏移量, 以输出图像像素为单位.
pub const DEFAULT_MAX_OFFSET: i64 = 10;

/// 默认最小峰值宽度. 激活游程长度必须 **严格大于** 该值才会被认定为峰.
pub const DEFAULT_MIN_PEAK_SIZE: usize = 3;

/// 重建边界框的最小边长 (像素). 宽或高不超过该值的框会被作为噪声丢弃.
pub const MIN_BOX_SIDE_PX: i64 = 10;

/// 平衡采样单次抽取的重试预算. 预算耗尽后采样器会静默接受任意剩余记录,
/// 保证抽取一定会终止.
pub const SAMPLER_RETRY_BUDGET: u32 = 10_000;

/// 网格向量的激活阈值. 真值标签取值 {0, 1}, 预测取值 [0, 1],
/// 两者都以该阈值判定某个 bin 是否激活.
pub const ACTIVE_THRESHOLD: f32 = 0.5;
