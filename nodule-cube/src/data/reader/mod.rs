//! 3D CT 扫描文件读取.
//!
//! 目前支持 nifti (`.nii`, `.nii.gz`) 和 MetaImage (`.mhd`, `.mha`) 两种格式.
//! 读取结果统一转换为 `(z, y, x)` 组织的 [`CtVolume`].

use std::path::Path;

use crate::{CtVolume, Error};

mod meta;
mod nii;

pub use meta::{ElementType, MetaHeader, MetaImageError};

/// 扫描文件格式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VolumeFormat {
    /// `.nii` 或 `.nii.gz`.
    Nifti,

    /// `.mhd` (数据在独立文件中) 或 `.mha` (数据紧跟文件头).
    MetaImage,
}

impl VolumeFormat {
    /// 根据文件名后缀 (不区分大小写) 推断格式. 无法识别时返回 `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(Self::Nifti)
        } else if name.ends_with(".mhd") || name.ends_with(".mha") {
            Some(Self::MetaImage)
        } else {
            None
        }
    }
}

/// 根据扩展名打开 3D CT 扫描.
pub(crate) fn read_volume(path: &Path) -> crate::Result<CtVolume> {
    match VolumeFormat::from_path(path) {
        Some(VolumeFormat::Nifti) => nii::read(path),
        Some(VolumeFormat::MetaImage) => meta::read(path),
        None => Err(Error::UnsupportedFormat(path.to_owned())),
    }
}
