//! 结节标注表.
//!
//! 每行对应一个结节标注, 至少包含以下列 (多余的列被忽略):
//!
//! | 列名 | 含义 |
//! |---|---|
//! | `patient_id` | 病人标识 |
//! | `file_path` | 扫描文件路径 |
//! | `z_center` | z 方向中心, 仅用于排序 |
//! | `z_center_perc`, `y_center_perc`, `x_center_perc` | 归一化中心 |
//! | `malscore` | 恶性程度评分 (0 ~ 5) |
//! | `spiculation` | 毛刺征评分 |
//! | `lobulation` | 分叶征评分 |

use std::io::Read;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Deserialize;

use crate::record::Labels;
use crate::NormCenter;

/// 标注表中的一行.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct AnnotationRow {
    /// 病人标识.
    pub patient_id: String,

    /// 扫描文件路径. 相对路径以数据集根目录为基准.
    pub file_path: PathBuf,

    /// z 方向中心.
    pub z_center: f64,

    /// z 方向归一化中心.
    pub z_center_perc: f64,

    /// y 方向归一化中心.
    pub y_center_perc: f64,

    /// x 方向归一化中心.
    pub x_center_perc: f64,

    /// 恶性程度评分.
    pub malscore: f64,

    /// 毛刺征评分.
    pub spiculation: f64,

    /// 分叶征评分.
    pub lobulation: f64,
}

/// 单个结节标注.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Annotation {
    /// 归一化中心, `[z, y, x]`.
    pub center: NormCenter,

    /// z 方向中心, 排序键.
    pub z_center: f64,

    /// 恶性程度评分.
    pub malignancy: f64,

    /// 毛刺征评分.
    pub spiculation: f64,

    /// 分叶征评分.
    pub lobulation: f64,
}

impl From<&AnnotationRow> for Annotation {
    fn from(row: &AnnotationRow) -> Self {
        Self {
            center: [row.z_center_perc, row.y_center_perc, row.x_center_perc],
            z_center: row.z_center,
            malignancy: row.malscore,
            spiculation: row.spiculation,
            lobulation: row.lobulation,
        }
    }
}

impl Annotation {
    /// 恶性程度评分作为分桶键. 仅当评分是整数时返回 `Some`.
    #[inline]
    pub fn malignancy_key(&self) -> Option<i64> {
        let m = self.malignancy;
        (m.is_finite() && m.fract() == 0.0).then_some(m as i64)
    }

    /// 写入记录的标签. 非整数评分向零取整.
    #[inline]
    pub fn labels(&self) -> Labels {
        Labels {
            malignancy: self.malignancy as i64,
            spiculation: self.spiculation as i64,
            lobulation: self.lobulation as i64,
        }
    }
}

/// 单个病人的所有标注.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientAnnotations {
    /// 病人标识.
    pub patient_id: String,

    /// 扫描文件路径, 取该病人第一行的 `file_path`.
    pub volume_path: PathBuf,

    /// 按 `z_center` 升序排列的标注.
    pub annotations: Vec<Annotation>,
}

impl PatientAnnotations {
    /// 扫描文件的实际路径. 相对路径以 `base_dir` 为基准.
    pub fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        if self.volume_path.is_absolute() {
            self.volume_path.clone()
        } else {
            base_dir.join(&self.volume_path)
        }
    }
}

/// 结节标注表.
#[derive(Clone, Debug, Default)]
pub struct AnnotationTable {
    rows: Vec<AnnotationRow>,
}

impl AnnotationTable {
    /// 打开 csv 格式的标注表. 缺少必需列或存在无法解析的行时返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        Self::from_csv(reader)
    }

    /// 从任意读取器解析带表头的 csv.
    pub fn from_reader<R: Read>(reader: R) -> crate::Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> crate::Result<Self> {
        let rows = reader
            .deserialize::<AnnotationRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[AnnotationRow] {
        &self.rows
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否为空表.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 按病人分组. 病人按首次出现的顺序排列, 组内标注按 `z_center` 稳定升序排列.
    pub fn patients(&self) -> Vec<PatientAnnotations> {
        self.rows
            .iter()
            .map(|r| r.patient_id.as_str())
            .unique()
            .map(|id| {
                let rows: Vec<&AnnotationRow> =
                    self.rows.iter().filter(|r| r.patient_id == id).collect();
                let mut annotations: Vec<Annotation> =
                    rows.iter().map(|&r| Annotation::from(r)).collect();
                annotations.sort_by_key(|a| OrderedFloat(a.z_center));
                PatientAnnotations {
                    patient_id: id.to_owned(),
                    volume_path: rows[0].file_path.clone(),
                    annotations,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Annotation, AnnotationTable};
    use crate::Error;
    use std::path::Path;

    const TABLE: &str = "\
patient_id,file_path,x_center,y_center,z_center,x_center_perc,y_center_perc,z_center_perc,malscore,spiculation,lobulation
p1,/data/p1.mhd,10,20,-120.5,0.25,0.5,0.1,3,1,2
p2,p2.mhd,11,21,-50,0.5,0.5,0.5,5,4,4
p1,/data/p1.mhd,12,22,-200.0,0.75,0.5,0.9,1,1,1
p1,/data/p1.mhd,13,23,-120.5,0.3,0.3,0.3,2.5,2.5,1
";

    #[test]
    fn test_parse_and_group() {
        let t = AnnotationTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(t.len(), 4);
        assert!(!t.is_empty());
        assert_eq!(t.rows()[0].x_center_perc, 0.25);

        let p = t.patients();
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].patient_id, "p1");
        assert_eq!(p[1].patient_id, "p2");
        assert_eq!(p[0].volume_path, Path::new("/data/p1.mhd"));

        // 按 z_center 升序, 相等时保持原顺序.
        let z: Vec<f64> = p[0].annotations.iter().map(|a| a.z_center).collect();
        assert_eq!(z, vec![-200.0, -120.5, -120.5]);
        assert_eq!(p[0].annotations[0].center, [0.9, 0.5, 0.75]);
        assert_eq!(p[0].annotations[1].malignancy, 3.0);
        assert_eq!(p[0].annotations[2].malignancy, 2.5);
    }

    #[test]
    fn test_resolve_path() {
        let t = AnnotationTable::from_reader(TABLE.as_bytes()).unwrap();
        let p = t.patients();
        let base = Path::new("/base");
        assert_eq!(p[0].resolve_path(base), Path::new("/data/p1.mhd"));
        assert_eq!(p[1].resolve_path(base), Path::new("/base/p2.mhd"));
    }

    #[test]
    fn test_labels_and_key() {
        let a = Annotation {
            center: [0.5; 3],
            z_center: 0.0,
            malignancy: 4.0,
            spiculation: 2.7,
            lobulation: -1.2,
        };
        assert_eq!(a.malignancy_key(), Some(4));
        let l = a.labels();
        assert_eq!((l.malignancy, l.spiculation, l.lobulation), (4, 2, -1));

        let a = Annotation {
            malignancy: 2.5,
            ..a
        };
        assert_eq!(a.malignancy_key(), None);
        let a = Annotation {
            malignancy: f64::NAN,
            ..a
        };
        assert_eq!(a.malignancy_key(), None);
    }

    #[test]
    fn test_missing_column() {
        let bad = "patient_id,file_path\np1,p1.mhd\n";
        let err = AnnotationTable::from_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_malformed_value() {
        let bad = "\
patient_id,file_path,z_center,x_center_perc,y_center_perc,z_center_perc,malscore,spiculation,lobulation
p1,p1.mhd,abc,0.1,0.1,0.1,1,1,1
";
        assert!(AnnotationTable::from_reader(bad.as_bytes()).is_err());
    }
}
