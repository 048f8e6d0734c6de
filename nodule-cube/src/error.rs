//! 运行时错误.

use std::path::PathBuf;

use thiserror::Error;

use crate::reader::MetaImageError;
use crate::resample::ResampleError;

/// 本 crate 的错误类型.
///
/// 除方向矩阵不一致 (仅警告) 和评分越界 (静默跳过) 外, 任何错误都会中止整个批处理.
#[derive(Error, Debug)]
pub enum Error {
    /// 底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 标注表读取或解析错误.
    #[error("annotation table error: {0}")]
    Csv(#[from] csv::Error),

    /// nifti 文件读取错误.
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// MetaImage 文件读取错误.
    #[error("MetaImage error: {0}")]
    MetaImage(#[from] MetaImageError),

    /// 重采样错误.
    #[error("resample error: {0}")]
    Resample(#[from] ResampleError),

    /// 扫描不是三维的. 参数为实际维数.
    #[error("expected a 3D volume, found {0} dimensions")]
    Dimension(usize),

    /// 数据与形状不符.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// 记录序列化错误.
    #[error("record encoding error: {0}")]
    Record(#[from] bincode::Error),

    /// 无法根据扩展名识别的扫描文件.
    #[error("unsupported volume format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// 本 crate 通用的 `Result`.
pub type Result<T> = std::result::Result<T, Error>;
