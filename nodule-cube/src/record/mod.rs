//! 训练样本记录的序列化.
//!
//! 一条记录由形状、标签和立方体体素三部分组成, 全部以 `i16` 存储,
//! 经 `bincode` (定长小端整数) 编码为负载. 文件中每条记录写作
//! `8 字节小端长度 + 负载`. 不压缩, 不校验.

use std::io::{self, Read, Write};

use ndarray::{Array3, ArrayView3, ShapeError};
use serde::{Deserialize, Serialize};

mod bucket;

pub use bucket::BucketWriters;

/// 结节标签.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Labels {
    /// 恶性程度评分, 同时作为分桶依据. 正常取值 0 ~ 5.
    pub malignancy: i64,

    /// 毛刺征评分.
    pub spiculation: i64,

    /// 分叶征评分.
    pub lobulation: i64,
}

impl Labels {
    /// 按 (恶性程度, 毛刺征, 分叶征) 的顺序转换为 `i16`, 超出范围的值取边界.
    #[inline]
    pub fn to_i16(&self) -> [i16; 3] {
        [self.malignancy, self.spiculation, self.lobulation].map(saturate_i64)
    }
}

#[inline]
fn saturate_i64(v: i64) -> i16 {
    v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// 一条训练样本.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// 立方体形状, `(z, y, x)`.
    pub shape: [i16; 3],

    /// 标签, (恶性程度, 毛刺征, 分叶征).
    pub label: [i16; 3],

    /// 行优先存储的体素.
    pub cube: Vec<i16>,
}

impl Record {
    /// 从立方体视图和标签构建记录. 体素四舍五入后截断到 `i16` 范围, NaN 记为 0.
    pub fn from_cube(cube: ArrayView3<f32>, labels: Labels) -> Self {
        let (z, y, x) = cube.dim();
        let shape = [z, y, x].map(|d| i16::try_from(d).unwrap_or(i16::MAX));
        Self {
            shape,
            label: labels.to_i16(),
            cube: cube.iter().map(|v| v.round() as i16).collect(),
        }
    }

    /// 将体素还原成三维数组.
    pub fn to_array(&self) -> Result<Array3<i16>, ShapeError> {
        let [z, y, x] = self.shape.map(|d| d.max(0) as usize);
        Array3::from_shape_vec((z, y, x), self.cube.clone())
    }
}

/// 记录写入器. 记录只追加, 不回读.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: W,
    count: usize,
}

impl<W: Write> RecordWriter<W> {
    /// 包装底层写入器.
    #[inline]
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// 追加一条记录.
    pub fn write(&mut self, record: &Record) -> crate::Result<()> {
        let payload = bincode::serialize(record)?;
        self.inner.write_all(&(payload.len() as u64).to_le_bytes())?;
        self.inner.write_all(&payload)?;
        self.count += 1;
        Ok(())
    }

    /// 已写入的记录条数.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// 刷新缓冲并取回底层写入器.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// 记录读取器, 按写入顺序迭代记录. 供下游或校验使用.
#[derive(Debug)]
pub struct RecordReader<R: Read> {
    inner: R,
}

impl<R: Read> RecordReader<R> {
    /// 包装底层读取器.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// 读取长度前缀. 在记录边界处遇到文件结尾时返回 `Ok(None)`.
    fn read_len(&mut self) -> io::Result<Option<u64>> {
        let mut buf = [0u8; 8];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Some(u64::from_le_bytes(buf)))
    }

    fn read_record(&mut self) -> crate::Result<Option<Record>> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        // 长度前缀可能已损坏, 按实际读到的字节增长缓冲.
        let mut payload = Vec::new();
        let read = self.inner.by_ref().take(len).read_to_end(&mut payload)?;
        if read as u64 != len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(Some(bincode::deserialize(&payload)?))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = crate::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
