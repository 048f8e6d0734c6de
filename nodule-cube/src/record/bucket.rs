use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::{Record, RecordWriter};
use crate::consts::RECORD_EXTENSION;

/// 单个病人的分桶输出.
///
/// 每个桶 (恶性程度评分) 对应一个 `<patient_id>_<bucket>.tfrecord` 文件.
/// 所有文件在构建时创建, 在 [`BucketWriters::finish`] 时关闭.
#[derive(Debug)]
pub struct BucketWriters {
    writers: BTreeMap<u8, RecordWriter<BufWriter<File>>>,
}

impl BucketWriters {
    /// 在 `dir` 下为 `patient_id` 创建 `0..buckets` 共 `buckets` 个输出文件.
    /// 同名文件会被截断.
    pub fn create<P: AsRef<Path>>(dir: P, patient_id: &str, buckets: u8) -> crate::Result<Self> {
        let mut writers = BTreeMap::new();
        for bucket in 0..buckets {
            let file = File::create(Self::bucket_path(dir.as_ref(), patient_id, bucket))?;
            writers.insert(bucket, RecordWriter::new(BufWriter::new(file)));
        }
        Ok(Self { writers })
    }

    /// 桶 `bucket` 对应的文件路径.
    pub fn bucket_path(dir: &Path, patient_id: &str, bucket: u8) -> PathBuf {
        dir.join(format!("{patient_id}_{bucket}.{RECORD_EXTENSION}"))
    }

    /// 评分 `score` 对应的桶. 没有对应的桶时返回 `None`.
    #[inline]
    pub fn bucket_of(&self, score: i64) -> Option<u8> {
        u8::try_from(score)
            .ok()
            .filter(|b| self.writers.contains_key(b))
    }

    /// 将 `record` 写入评分 `score` 对应的桶.
    ///
    /// 评分没有对应的桶时不写入任何内容, 返回 `Ok(false)`.
    pub fn write(&mut self, score: i64, record: &Record) -> crate::Result<bool> {
        let Some(writer) = self.bucket_of(score).and_then(|b| self.writers.get_mut(&b)) else {
            return Ok(false);
        };
        writer.write(record)?;
        Ok(true)
    }

    /// 每个桶已写入的记录条数.
    pub fn counts(&self) -> BTreeMap<u8, usize> {
        self.writers.iter().map(|(&b, w)| (b, w.count())).collect()
    }

    /// 刷新并关闭所有文件.
    pub fn finish(self) -> crate::Result<()> {
        for writer in self.writers.into_values() {
            writer.finish()?;
        }
        Ok(())
    }
}
