//! 批处理流程.
//!
//! 对标注表中的每个病人依次: 读取扫描 -> 方向检查 (仅警告) -> 重采样 ->
//! 按 `z_center` 升序提取立方体 -> 按恶性程度评分写入对应文件.
//! 任何 I/O 或解析错误都会中止整个批处理.

use std::collections::BTreeMap;
use std::fs;

use crate::cube::extract_cube_with_edge;
use crate::dataset::{patient_loader, AnnotationTable, PatientAnnotations};
use crate::record::{BucketWriters, Record};
use crate::resample::{LinearResize, PlaneStackResize, Resampler};
use crate::{CtVolume, ExtractConfig, Idx3d};

/// 单个病人的处理结果.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientSummary {
    /// 病人标识.
    pub patient_id: String,

    /// 重采样后的扫描形状.
    pub resampled_shape: Idx3d,

    /// 每个桶写入的记录条数.
    pub written: BTreeMap<u8, usize>,

    /// 因评分没有对应的桶而跳过的标注个数.
    pub skipped: usize,
}

impl PatientSummary {
    /// 写入的记录总数.
    #[inline]
    pub fn total_written(&self) -> usize {
        self.written.values().sum()
    }
}

/// 整个批处理的结果.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 按处理顺序排列的病人结果.
    pub patients: Vec<PatientSummary>,
}

impl RunSummary {
    /// 写入的记录总数.
    pub fn total_written(&self) -> usize {
        self.patients.iter().map(PatientSummary::total_written).sum()
    }

    /// 跳过的标注总数.
    pub fn total_skipped(&self) -> usize {
        self.patients.iter().map(|p| p.skipped).sum()
    }
}

/// 立方体提取器. 持有配置和重采样器, 串行处理所有病人.
#[derive(Clone, Debug)]
pub struct CubeExtractor<R = LinearResize> {
    config: ExtractConfig,
    resampler: Resampler<R>,
}

impl CubeExtractor<LinearResize> {
    /// 以双线性插值重采样构建.
    #[inline]
    pub fn new(config: ExtractConfig) -> Self {
        Self::with_resizer(config, LinearResize::default())
    }
}

impl<R: PlaneStackResize> CubeExtractor<R> {
    /// 以自定义缩放原语构建.
    #[inline]
    pub fn with_resizer(config: ExtractConfig, resizer: R) -> Self {
        Self {
            config,
            resampler: Resampler::new(resizer),
        }
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// 处理标注表中的所有病人.
    pub fn run(&self) -> crate::Result<RunSummary> {
        let table = AnnotationTable::open(&self.config.table_path)?;
        fs::create_dir_all(&self.config.output_dir)?;

        let loader = patient_loader(table.patients(), &self.config.base_dir);
        let total = loader.len();
        log::info!("{total} patients, {} annotations", table.len());

        let mut summary = RunSummary::default();
        for (i, (patient, volume)) in loader.enumerate() {
            log::info!("[{}/{total}] {}", i + 1, patient.patient_id);
            summary
                .patients
                .push(self.process_patient(&patient, volume?)?);
        }
        Ok(summary)
    }

    /// 处理单个病人: 方向检查, 重采样, 提取并写入所有标注.
    ///
    /// 输出目录必须已经存在.
    pub fn process_patient(
        &self,
        patient: &PatientAnnotations,
        volume: CtVolume,
    ) -> crate::Result<PatientSummary> {
        let id = patient.patient_id.as_str();
        if !volume.is_identity_direction(self.config.direction_tolerance) {
            log::warn!("{id}: image in different direction {:?}", volume.direction());
        }

        let volume = self
            .resampler
            .rescale_volume(volume, self.config.target_voxel_mm)?;

        let mut writers =
            BucketWriters::create(&self.config.output_dir, id, self.config.bucket_count)?;
        let mut skipped = 0;
        for a in &patient.annotations {
            let cube = extract_cube_with_edge(volume.data(), a.center, self.config.cube_edge);
            match a.malignancy_key().filter(|&k| writers.bucket_of(k).is_some()) {
                Some(key) => {
                    writers.write(key, &Record::from_cube(cube, a.labels()))?;
                }
                None => {
                    skipped += 1;
                    log::debug!("{id}: no bucket for malignancy {}", a.malignancy);
                }
            }
        }

        let written = writers.counts();
        writers.finish()?;
        Ok(PatientSummary {
            patient_id: id.to_owned(),
            resampled_shape: volume.shape(),
            written,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::CubeExtractor;
    use crate::dataset::{Annotation, PatientAnnotations};
    use crate::record::{BucketWriters, Record, RecordReader};
    use crate::resample::LinearResize;
    use crate::{CtVolume, ExtractConfig, IDENTITY_DIRECTION};
    use ndarray::{s, Array3};
    use std::fs::File;
    use std::path::{Path, PathBuf};

    fn annotation(center: [f64; 3], malignancy: f64) -> Annotation {
        Annotation {
            center,
            z_center: 0.0,
            malignancy,
            spiculation: 1.0,
            lobulation: 2.0,
        }
    }

    fn read_bucket(dir: &Path, id: &str, bucket: u8) -> Vec<Record> {
        let f = File::open(BucketWriters::bucket_path(dir, id, bucket)).unwrap();
        RecordReader::new(f).collect::<crate::Result<_>>().unwrap()
    }

    fn volume_64() -> Array3<f32> {
        Array3::from_shape_fn((64, 64, 64), |(z, y, x)| {
            (z as f32 - 32.0) * 30.0 + (y as f32) * 2.0 - (x as f32)
        })
    }

    #[test]
    fn test_process_patient_identity() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractConfig::new(dir.path())
            .with_output_dir(dir.path())
            .with_target_voxel_mm(1.0);
        let extractor = CubeExtractor::new(config);

        let data = volume_64();
        let volume = CtVolume::from_parts(data.clone(), [1.0; 3], IDENTITY_DIRECTION);
        let patient = PatientAnnotations {
            patient_id: "p".to_owned(),
            volume_path: PathBuf::new(),
            annotations: vec![
                annotation([0.5, 0.5, 0.5], 3.0),
                annotation([0.0, 0.5, 0.5], 3.0),
                annotation([0.5, 0.5, 0.5], 0.0),
                annotation([0.5, 0.5, 0.5], 6.0),
                annotation([0.5, 0.5, 0.5], 2.5),
            ],
        };

        let summary = extractor.process_patient(&patient, volume).unwrap();
        assert_eq!(summary.resampled_shape, (64, 64, 64));
        assert_eq!(summary.total_written(), 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.written[&3], 2);
        assert_eq!(summary.written[&0], 1);

        let records = read_bucket(dir.path(), "p", 3);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].shape, [32, 32, 32]);
        assert_eq!(records[0].label, [3, 1, 2]);

        let central = records[0].to_array().unwrap();
        let expect = data.slice(s![16..48, 16..48, 16..48]).mapv(|v| v.round() as i16);
        assert_eq!(central, expect);

        let shifted = records[1].to_array().unwrap();
        let expect = data.slice(s![0..32, 16..48, 16..48]).mapv(|v| v.round() as i16);
        assert_eq!(shifted, expect);

        for bucket in [1, 2, 4, 5] {
            assert!(read_bucket(dir.path(), "p", bucket).is_empty());
        }
    }

    #[test]
    fn test_direction_mismatch_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractConfig::new(dir.path()).with_output_dir(dir.path());
        let extractor = CubeExtractor::with_resizer(config, LinearResize::with_max_channels(16));

        let mut direction = IDENTITY_DIRECTION;
        direction[0][0] = -1.0;
        let volume = CtVolume::from_parts(Array3::zeros((20, 40, 40)), [2.5, 0.7, 0.7], direction);
        let patient = PatientAnnotations {
            patient_id: "flipped".to_owned(),
            volume_path: PathBuf::new(),
            annotations: vec![annotation([0.5, 0.5, 0.5], 5.0)],
        };

        let summary = extractor.process_patient(&patient, volume).unwrap();
        // round(20 * 2.5 / 0.682) = 73, round(40 * 0.7 / 0.682) = 41
        assert_eq!(summary.resampled_shape, (73, 41, 41));
        assert_eq!(summary.written[&5], 1);
        let records = read_bucket(dir.path(), "flipped", 5);
        assert_eq!(records[0].shape, [32, 32, 32]);
        assert!(records[0].cube.iter().all(|&v| v == 0));
    }
}
