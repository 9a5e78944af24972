//! 批量装配: 训练批次、单病例样本与推理用全量输入的生成.

use std::path::{Path, PathBuf};

use ndarray::{s, Array2, Array4};
use rand::Rng;

use super::{BalancedSampler, LabelRecord, LabelTable, LabelTableError};
use crate::data::{PixelShift, StudyImage};
use crate::grid::{encode_study, GridVec};
use crate::PipelineCfg;

/// 一个训练批次.
#[derive(Debug, Clone)]
pub struct Batch {
    /// 图像数组, 形状 `[batch, 高, 宽, 1]`, 取值 `[0, 1]`.
    pub images: Array4<f32>,

    /// 网格标签数组, 形状 `[batch, 2S]`, 真值取值 {0, 1}.
    pub labels: Array2<f32>,

    /// 每个样本对应的病例 id.
    pub study_ids: Vec<String>,
}

/// 样本生成器. 驱动图像加载、平移增强、网格编码与类平衡采样,
/// 装配出训练或推理所需的数组.
#[derive(Debug)]
pub struct StudyGenerator {
    dir: PathBuf,
    table: LabelTable,
    cfg: PipelineCfg,
    ignore_caches: bool,
}

impl StudyGenerator {
    /// 从数据目录与已加载的标注表构建生成器.
    ///
    /// `dir` 必须是目录, 否则程序 panic.
    pub fn new<P: AsRef<Path>>(dir: P, table: LabelTable, cfg: PipelineCfg) -> StudyGenerator {
        let dir = dir.as_ref().to_owned();
        assert!(dir.is_dir());

        Self {
            dir,
            table,
            cfg,
            ignore_caches: false,
        }
    }

    /// 打开数据目录并加载标注表.
    ///
    /// 提供 `labels_csv` 时从 csv 加载; 否则为目录下每个 `.dcm`
    /// 文件生成一条合成阴性记录 (见 [`LabelTable::from_dcm_dir`]).
    ///
    /// `dir` 必须是目录, 否则程序 panic.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        labels_csv: Option<&Path>,
        cfg: PipelineCfg,
    ) -> Result<StudyGenerator, LabelTableError> {
        let table = match labels_csv {
            Some(p) => LabelTable::from_csv(p)?,
            None => LabelTable::from_dcm_dir(&dir)?,
        };
        Ok(Self::new(dir, table, cfg))
    }

    /// 标注表.
    #[inline]
    pub fn table(&self) -> &LabelTable {
        &self.table
    }

    /// 流水线配置.
    #[inline]
    pub fn cfg(&self) -> &PipelineCfg {
        &self.cfg
    }

    /// 是否绕过 npy 缓存.
    #[inline]
    pub fn ignore_caches(&self) -> bool {
        self.ignore_caches
    }

    /// 设置是否绕过 npy 缓存. 这是操作者使缓存失效的唯一手段:
    /// 缓存绝不会被自动判定为过期.
    #[inline]
    pub fn set_ignore_caches(&mut self, yes: bool) {
        self.ignore_caches = yes;
    }

    /// 生成单病例样本 (图像, 网格标签).
    ///
    /// 为整个病例抽取 **一个** 平移偏移: 图像与该病例的全部标注记录
    /// 共用它, 保证两者一致. `augment` 为假时偏移强制为零.
    pub fn generate_for_study<R: Rng>(
        &self,
        rng: &mut R,
        study_id: &str,
        augment: bool,
    ) -> Result<(StudyImage, GridVec), crate::LoadImageError> {
        let shift = if augment {
            PixelShift::sample(rng, self.cfg.max_offset())
        } else {
            PixelShift::NONE
        };

        let image = StudyImage::load(&self.dir, study_id, &self.cfg, self.ignore_caches)?;
        let image = image.rolled(shift);

        // 编码必须发生在增强之后, 与图像共用同一偏移.
        let labels = encode_study(self.table.for_study(study_id), shift, &self.cfg);
        Ok((image, labels))
    }

    /// 生成一个类平衡训练批次.
    ///
    /// `n == 0` 或 `n >= 表长` 时退化为全量遍历 (见
    /// [`BalancedSampler::draw`]), 此时批大小为表长.
    ///
    /// `positive_split` 必须在 `[0, 1]` 内, 否则程序 panic.
    pub fn generate_batch<R: Rng>(
        &self,
        rng: &mut R,
        n: usize,
        augment: bool,
        positive_split: f32,
    ) -> Result<Batch, crate::LoadImageError> {
        let sampler = BalancedSampler::new(&self.table, positive_split)
            .expect("positive_split 必须在 [0, 1] 内");
        let draw = sampler.draw(rng, n);

        let (h, w) = self.cfg.img_size();
        let mut images = Array4::zeros((draw.len(), h, w, 1));
        let mut labels = Array2::zeros((draw.len(), self.cfg.grid_len()));

        for (i, study_id) in draw.study_ids().iter().enumerate() {
            let (image, grid) = self.generate_for_study(rng, study_id, augment)?;
            images.slice_mut(s![i, .., .., 0]).assign(&image.data());
            labels.row_mut(i).assign(&grid);
        }

        Ok(Batch {
            images,
            labels,
            study_ids: draw.into_study_ids(),
        })
    }

    /// 为推理物化全量输入: 返回全部标注记录与对应的图像数组
    /// (形状 `[表长, 高, 宽, 1]`).
    ///
    /// 不做增强, 也不做标签编码; 每条记录产生一行图像.
    pub fn generate_for_inference(
        &self,
    ) -> Result<(&[LabelRecord], Array4<f32>), crate::LoadImageError> {
        let records = self.table.records();
        let (h, w) = self.cfg.img_size();
        let mut images = Array4::zeros((records.len(), h, w, 1));

        for (i, rec) in records.iter().enumerate() {
            let image = StudyImage::load(&self.dir, rec.study_id(), &self.cfg, self.ignore_caches)?;
            images.slice_mut(s![i, .., .., 0]).assign(&image.data());
        }
        Ok((records, images))
    }
}

#[cfg(test)]
mod tests {
    use super::StudyGenerator;
    use crate::data::cache_path;
    use crate::dataset::{LabelRecord, LabelTable};
    use crate::grid::{decode_boxes, RefBox};
    use crate::PipelineCfg;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 在临时目录中为若干病例预置 npy 缓存, 返回生成器.
    fn seeded_generator(dir: &std::path::Path, records: Vec<LabelRecord>) -> StudyGenerator {
        let cfg = PipelineCfg::default();
        for rec in &records {
            let fill = rec.study_id().len() as f32 / 100.0;
            let arr = Array2::from_elem(cfg.img_size(), fill);
            ndarray_npy::write_npy(cache_path(dir, rec.study_id()), &arr).unwrap();
        }
        StudyGenerator::new(dir, LabelTable::from_records(records), cfg)
    }

    fn study_box() -> RefBox {
        RefBox {
            x: 256.0,
            y: 256.0,
            w: 256.0,
            h: 256.0,
        }
    }

    #[test]
    fn test_generate_for_study() {
        let dir = tempfile::tempdir().unwrap();
        let gen = seeded_generator(
            dir.path(),
            vec![
                LabelRecord::positive("pa", study_box()),
                LabelRecord::negative("nb"),
            ],
        );
        let mut rng = StdRng::seed_from_u64(5);

        let (image, labels) = gen.generate_for_study(&mut rng, "pa", false).unwrap();
        assert_eq!(image.shape(), (128, 128));
        assert!(labels.iter().any(|v| *v >= 0.5));

        // 无增强时解码恢复原框位置 (输出空间 [32, 64] x [32, 64]).
        let boxes = decode_boxes(labels.as_slice().unwrap(), (128, 128), gen.cfg());
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].xmin - 32).abs() <= 8 && (boxes[0].ymax - 64).abs() <= 8);

        // 阴性病例编码为零向量.
        let (_, labels) = gen.generate_for_study(&mut rng, "nb", true).unwrap();
        assert!(labels.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_generate_batch_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let gen = seeded_generator(
            dir.path(),
            vec![
                LabelRecord::positive("pa", study_box()),
                LabelRecord::positive("pb", study_box()),
                LabelRecord::negative("nc"),
                LabelRecord::negative("nd"),
            ],
        );
        let mut rng = StdRng::seed_from_u64(11);

        let batch = gen.generate_batch(&mut rng, 2, true, 0.5).unwrap();
        assert_eq!(batch.images.dim(), (2, 128, 128, 1));
        assert_eq!(batch.labels.dim(), (2, 32));
        assert_eq!(batch.study_ids.len(), 2);

        // 全量遍历: 批大小为表长, 按表序.
        let batch = gen.generate_batch(&mut rng, 0, false, 0.5).unwrap();
        assert_eq!(batch.images.dim(), (4, 128, 128, 1));
        assert_eq!(batch.study_ids, ["pa", "pb", "nc", "nd"]);

        // 图像行确实来自对应病例的缓存 (常值填充为 id 长度 / 100).
        assert_eq!(batch.images[[0, 0, 0, 0]], 0.02);
    }

    #[test]
    fn test_generate_for_inference() {
        let dir = tempfile::tempdir().unwrap();
        let gen = seeded_generator(
            dir.path(),
            vec![
                LabelRecord::positive("pa", study_box()),
                LabelRecord::negative("nb"),
            ],
        );

        let (records, images) = gen.generate_for_inference().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(images.dim(), (2, 128, 128, 1));
        assert_eq!(images[[1, 5, 7, 0]], 0.02);
    }

    /// 缺失源文件且无缓存时, 生成是致命错误.
    #[test]
    fn test_generate_missing_study_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let gen = seeded_generator(dir.path(), vec![LabelRecord::negative("nb")]);
        let mut rng = StdRng::seed_from_u64(2);

        assert!(gen.generate_for_study(&mut rng, "ghost", false).is_err());
    }
}
