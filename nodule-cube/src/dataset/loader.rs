//! 按病人顺序加载扫描.
//!
//! 提供迭代器风格的数据获取模式.

use std::path::{Path, PathBuf};

use super::PatientAnnotations;
use crate::CtVolume;

/// 从病人标注列表和数据集根目录创建扫描加载器.
///
/// # 注意
///
/// 每个病人的 `volume_path` 必须指向可读的扫描文件 (相对路径以 `base_dir` 为基准),
/// 否则加载器在迭代时会返回 `Result::Err`.
pub fn patient_loader<I: IntoIterator<Item = PatientAnnotations>, P: AsRef<Path>>(
    patients: I,
    base_dir: P,
) -> PatientLoader {
    let mut patients: Vec<PatientAnnotations> = patients.into_iter().collect();
    patients.reverse();

    PatientLoader {
        base_dir: base_dir.as_ref().to_owned(),
        patients_rev: patients,
    }
}

/// 按病人迭代的 3D CT 扫描加载器. 每次迭代才真正读取文件.
#[derive(Debug)]
pub struct PatientLoader {
    base_dir: PathBuf,
    patients_rev: Vec<PatientAnnotations>,
}

impl Iterator for PatientLoader {
    type Item = (PatientAnnotations, crate::Result<CtVolume>);

    fn next(&mut self) -> Option<Self::Item> {
        let patient = self.patients_rev.pop()?;
        let data = CtVolume::open(patient.resolve_path(&self.base_dir));
        Some((patient, data))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl ExactSizeIterator for PatientLoader {
    #[inline]
    fn len(&self) -> usize {
        self.patients_rev.len()
    }
}
