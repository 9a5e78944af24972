//! 单病例图像数据: DICOM 解码、规范化与 npy 缓存.

use std::ops::Index;
use std::path::{Path, PathBuf};

use dicom_object::open_file;
use dicom_pixeldata::PixelDecoder;
use image::imageops::FilterType;
use ndarray::{Array2, ArrayView2};
use ndarray_npy::{ReadNpyError, WriteNpyError};

use crate::consts::ext;
use crate::{Idx2d, PipelineCfg};

mod augment;

pub use augment::{roll2d, PixelShift};

/// 加载病例图像错误. 所有变体都是致命的: 源文件缺失或损坏不会被
/// 静默替换为空白图像, 缓存损坏也不会自动回退到重新解码.
#[derive(Debug)]
pub enum LoadImageError {
    /// 打开或解析 DICOM 文件错误.
    Read(dicom_object::ReadError),

    /// 解码 DICOM 像素数据错误.
    Pixel(dicom_pixeldata::Error),

    /// 像素缓冲区与声明的形状不符 (如多帧或多通道数据).
    /// 载荷为 `(rows, columns, 缓冲区长度)`.
    PixelShape(u32, u32, usize),

    /// 读取 npy 缓存错误.
    CacheRead(ReadNpyError),

    /// 写入 npy 缓存错误.
    CacheWrite(WriteNpyError),
}

impl From<dicom_object::ReadError> for LoadImageError {
    fn from(e: dicom_object::ReadError) -> Self {
        Self::Read(e)
    }
}

impl From<dicom_pixeldata::Error> for LoadImageError {
    fn from(e: dicom_pixeldata::Error) -> Self {
        Self::Pixel(e)
    }
}

impl From<ReadNpyError> for LoadImageError {
    fn from(e: ReadNpyError) -> Self {
        Self::CacheRead(e)
    }
}

impl From<WriteNpyError> for LoadImageError {
    fn from(e: WriteNpyError) -> Self {
        Self::CacheWrite(e)
    }
}

/// 病例原始 DICOM 文件的路径, 即 `{dir}/{study_id}.dcm`.
#[inline]
pub fn dcm_path<P: AsRef<Path>>(dir: P, study_id: &str) -> PathBuf {
    dir.as_ref().join(format!("{study_id}.{}", ext::DCM))
}

/// 病例解码缓存文件的路径, 即 `{dir}/{study_id}.npy`.
#[inline]
pub fn cache_path<P: AsRef<Path>>(dir: P, study_id: &str) -> PathBuf {
    dir.as_ref().join(format!("{study_id}.{}", ext::CACHE))
}

/// 单病例的规范化灰度图像: 固定输出尺寸的 `f32` 二维数组, 取值 `[0, 1]`,
/// 行对应图像高度方向.
///
/// 该图像创建后不再就地修改; 平移增强通过 [`StudyImage::rolled`] 产生新实例.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyImage {
    data: Array2<f32>,
}

impl Index<Idx2d> for StudyImage {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl StudyImage {
    /// 加载病例图像, 优先使用 npy 缓存.
    ///
    /// 1. 若缓存存在且未被 `bypass_cache` 绕过, 则原样读回缓存数组;
    ///   缓存损坏是致命错误, 操作者只能通过显式绕过缓存来恢复.
    /// 2. 否则解码 `{study_id}.dcm`: 转为单通道灰度, 以 Lanczos 平滑滤波
    ///   缩放到配置的输出尺寸, 规范化到 `[0, 1]` 的 `f32`,
    ///   然后写入缓存并返回.
    pub fn load<P: AsRef<Path>>(
        dir: P,
        study_id: &str,
        cfg: &PipelineCfg,
        bypass_cache: bool,
    ) -> Result<Self, LoadImageError> {
        let cache = cache_path(&dir, study_id);

        if !bypass_cache && cache.is_file() {
            let data: Array2<f32> = ndarray_npy::read_npy(&cache)?;
            return Ok(Self { data });
        }

        let data = Self::decode_dcm(dcm_path(&dir, study_id).as_path(), cfg.img_size())?;
        log::info!("caching image: {}", cache.display());
        ndarray_npy::write_npy(&cache, &data)?;
        Ok(Self { data })
    }

    /// 解码单个 DICOM 文件并做预处理 (缩放 + 规范化), 不涉及缓存.
    fn decode_dcm(path: &Path, (h, w): Idx2d) -> Result<Array2<f32>, LoadImageError> {
        let obj = open_file(path)?;
        let decoded = obj.decode_pixel_data()?;

        let (rows, columns) = (decoded.rows(), decoded.columns());
        let pixels = decoded.to_vec::<u8>()?;
        if pixels.len() != rows as usize * columns as usize {
            return Err(LoadImageError::PixelShape(rows, columns, pixels.len()));
        }

        // 该构造只在长度不符时失败, 上面已检查过.
        let gray = image::GrayImage::from_raw(columns, rows, pixels).unwrap();
        let resized = image::imageops::resize(&gray, w as u32, h as u32, FilterType::Lanczos3);

        Ok(Array2::from_shape_fn((h, w), |(r, c)| {
            f32::from(resized.get_pixel(c as u32, r as u32).0[0]) / 255.0
        }))
    }

    /// 根据裸数组直接创建实体, 不经过解码与缓存.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体 (如取值超出 `[0, 1]`),
    /// 因此你应仅将其用于实验目的.
    #[inline]
    pub fn fake(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// 图像尺寸 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// 取出底层数组.
    #[inline]
    pub fn into_inner(self) -> Array2<f32> {
        self.data
    }

    /// 返回环形平移 `shift` 之后的新图像. 见 [`roll2d`].
    /// 零偏移时返回逐元素相同的拷贝.
    #[inline]
    pub fn rolled(&self, shift: PixelShift) -> StudyImage {
        Self {
            data: roll2d(self.data.view(), shift),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cache_path, dcm_path, StudyImage};
    use crate::PipelineCfg;
    use ndarray::Array2;

    #[test]
    fn test_paths() {
        let d = dcm_path("/tmp/data", "abc");
        assert_eq!(d.to_str().unwrap(), "/tmp/data/abc.dcm");
        let c = cache_path("/tmp/data", "abc");
        assert_eq!(c.to_str().unwrap(), "/tmp/data/abc.npy");
    }

    /// 缓存幂等: 同一病例两次加载返回按位相同的数组, 且第二次不触碰
    /// DICOM 源文件 (目录中根本没有 .dcm 文件).
    #[test]
    fn test_cache_idempotent_no_decode() {
        let cfg = PipelineCfg::default();
        let dir = tempfile::tempdir().unwrap();

        let seeded = Array2::from_shape_fn(cfg.img_size(), |(r, c)| (r * 131 + c) as f32 / 16384.0);
        ndarray_npy::write_npy(cache_path(dir.path(), "s0"), &seeded).unwrap();

        let first = StudyImage::load(dir.path(), "s0", &cfg, false).unwrap();
        let second = StudyImage::load(dir.path(), "s0", &cfg, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.data(), seeded.view());
    }

    /// 绕过缓存时必须重新解码; 没有源文件就是致命错误.
    #[test]
    fn test_cache_bypass_requires_source() {
        let cfg = PipelineCfg::default();
        let dir = tempfile::tempdir().unwrap();

        let seeded = Array2::<f32>::zeros(cfg.img_size());
        ndarray_npy::write_npy(cache_path(dir.path(), "s1"), &seeded).unwrap();

        assert!(StudyImage::load(dir.path(), "s1", &cfg, false).is_ok());
        assert!(StudyImage::load(dir.path(), "s1", &cfg, true).is_err());
    }

    /// 损坏的缓存是致命错误, 不自动回退.
    #[test]
    fn test_corrupt_cache_is_fatal() {
        let cfg = PipelineCfg::default();
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(cache_path(dir.path(), "s2"), b"not an npy file").unwrap();
        assert!(StudyImage::load(dir.path(), "s2", &cfg, false).is_err());
    }

    #[test]
    fn test_rolled_preserves_shape() {
        let img = StudyImage::fake(Array2::from_elem((4, 6), 0.5));
        let rolled = img.rolled(super::PixelShift { dx: 3, dy: -2 });
        assert_eq!(rolled.shape(), (4, 6));
        assert_eq!(img, rolled); // 常值图像平移后不变
    }
}
