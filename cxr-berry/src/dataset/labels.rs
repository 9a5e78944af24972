//! 标注表. 每行描述一个 (病例, 边界框) 对.

use std::fs;
use std::path::Path;

use crate::consts::ext;
use crate::grid::RefBox;

/// 标注表加载错误.
///
/// 表的完整性在加载期即被检查, 不会推迟到编码期才暴露.
#[derive(Debug)]
pub enum LabelTableError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 解析 csv 错误.
    Csv(csv::Error),

    /// 行的列数不是 6. 载荷为 (行号, 实际列数).
    ColumnCount(u64, usize),

    /// 阳性记录的几何字段无法解析为数值. 载荷为行号.
    BadGeometry(u64),

    /// target 字段既不是 0 也不是 1. 载荷为行号.
    BadTarget(u64),
}

impl From<std::io::Error> for LabelTableError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for LabelTableError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// 单行标注: 一个病例 id, 以及 target 为阳性时的参考画布边界框.
///
/// 同一个病例 id 可以对应多行 (多个框), 或者对应单独一行阴性记录.
/// 阴性记录的几何字段被忽略.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    study_id: String,
    bounds: Option<RefBox>,
}

impl LabelRecord {
    /// 创建阳性记录.
    #[inline]
    pub fn positive<S: Into<String>>(study_id: S, bounds: RefBox) -> LabelRecord {
        Self {
            study_id: study_id.into(),
            bounds: Some(bounds),
        }
    }

    /// 创建阴性记录.
    #[inline]
    pub fn negative<S: Into<String>>(study_id: S) -> LabelRecord {
        Self {
            study_id: study_id.into(),
            bounds: None,
        }
    }

    /// 病例 id.
    #[inline]
    pub fn study_id(&self) -> &str {
        &self.study_id
    }

    /// 边界框. 阴性记录返回 `None`.
    #[inline]
    pub fn bounds(&self) -> Option<&RefBox> {
        self.bounds.as_ref()
    }

    /// 是否为阳性记录.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.bounds.is_some()
    }
}

/// 完整标注表. 在流水线启动时加载一次, 此后在整个运行期内不可变.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    records: Vec<LabelRecord>,
}

impl LabelTable {
    /// 从 csv 文件加载标注表.
    ///
    /// 文件必须带表头行 (跳过), 数据列依次为
    /// `[studyId, x, y, width, height, target]`.
    /// 阴性记录的几何字段不做解析; 阳性记录的几何字段必须是数值.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, LabelTableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let line = row.position().map_or(0, |p| p.line());
            if row.len() != 6 {
                return Err(LabelTableError::ColumnCount(line, row.len()));
            }

            let study_id = row[0].to_owned();
            let rec = match row[5].trim() {
                "0" => LabelRecord::negative(study_id),
                "1" => {
                    let mut geo = [0.0f32; 4];
                    for (dst, src) in geo.iter_mut().zip(row.iter().skip(1)) {
                        *dst = src
                            .trim()
                            .parse()
                            .map_err(|_| LabelTableError::BadGeometry(line))?;
                    }
                    let [x, y, w, h] = geo;
                    LabelRecord::positive(study_id, RefBox { x, y, w, h })
                }
                _ => return Err(LabelTableError::BadTarget(line)),
            };
            records.push(rec);
        }
        Ok(Self { records })
    }

    /// 没有标注表时的退化构造: 为目录下每个 `.dcm` 文件按文件名主干
    /// 生成一条阴性记录. 记录按病例 id 排序, 与目录读取顺序无关.
    pub fn from_dcm_dir<P: AsRef<Path>>(dir: P) -> Result<Self, LabelTableError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext::DCM) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                records.push(LabelRecord::negative(stem));
            }
        }
        records.sort_by(|a, b| a.study_id().cmp(b.study_id()));
        Ok(Self { records })
    }

    /// 从已有记录直接构造标注表.
    #[inline]
    pub fn from_records(records: Vec<LabelRecord>) -> LabelTable {
        Self { records }
    }

    /// 记录总数 (行数, 不是病例数).
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 表是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 全部记录.
    #[inline]
    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    /// 迭代给定病例的全部记录.
    pub fn for_study<'a>(&'a self, study_id: &'a str) -> impl Iterator<Item = &'a LabelRecord> {
        self.records.iter().filter(move |r| r.study_id() == study_id)
    }

    /// 阳性记录数.
    #[inline]
    pub fn num_positive(&self) -> usize {
        self.records.iter().filter(|r| r.is_positive()).count()
    }

    /// 阴性记录数.
    #[inline]
    pub fn num_negative(&self) -> usize {
        self.len() - self.num_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelRecord, LabelTable, LabelTableError};
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_from_csv_generic() {
        let f = write_csv(
            "patientId,x,y,width,height,Target\n\
             p0,,,,,0\n\
             p1,264.0,152.0,213.0,379.0,1\n\
             p1,562.0,152.0,256.0,453.0,1\n",
        );
        let table = LabelTable::from_csv(f.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.num_positive(), 2);
        assert_eq!(table.num_negative(), 1);

        assert!(!table.records()[0].is_positive());
        let b = table.records()[1].bounds().unwrap();
        assert_eq!((b.x, b.y, b.w, b.h), (264.0, 152.0, 213.0, 379.0));

        assert_eq!(table.for_study("p1").count(), 2);
        assert_eq!(table.for_study("p2").count(), 0);
    }

    /// 表的错误在加载期即报告.
    #[test]
    fn test_from_csv_malformed() {
        let f = write_csv("patientId,x,y,width,height,Target\np0,1.0,2.0,0\n");
        assert!(matches!(
            LabelTable::from_csv(f.path()),
            Err(LabelTableError::ColumnCount(2, 4)),
        ));

        let f = write_csv("patientId,x,y,width,height,Target\np0,oops,2.0,3.0,4.0,1\n");
        assert!(matches!(
            LabelTable::from_csv(f.path()),
            Err(LabelTableError::BadGeometry(2)),
        ));

        // 阴性记录的几何字段不做解析.
        let f = write_csv("patientId,x,y,width,height,Target\np0,oops,,,,0\n");
        assert!(LabelTable::from_csv(f.path()).is_ok());

        let f = write_csv("patientId,x,y,width,height,Target\np0,1.0,2.0,3.0,4.0,2\n");
        assert!(matches!(
            LabelTable::from_csv(f.path()),
            Err(LabelTableError::BadTarget(2)),
        ));
    }

    /// 无标注表时按目录内容生成合成阴性记录.
    #[test]
    fn test_from_dcm_dir() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.dcm", "a.dcm", "c.npy", "noise.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let table = LabelTable::from_dcm_dir(dir.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.num_positive(), 0);
        assert_eq!(
            table.records(),
            &[LabelRecord::negative("a"), LabelRecord::negative("b")],
        );
    }
}
