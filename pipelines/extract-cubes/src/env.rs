//! 从环境变量构建配置.

use std::env;
use std::path::PathBuf;

use nodule_cube::consts::TARGET_VOXEL_MM;
use nodule_cube::dataset::home_dataset_dir_with;
use nodule_cube::ExtractConfig;

/// 获取数据集根目录.
///
/// 1. 若环境变量 `$NODULE_BASE_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/kaggle_ndsb2017`;
/// 3. 连主目录都无法确定时, 返回当前目录.
pub fn base_dir_from_env_or_home() -> PathBuf {
    match env::var("NODULE_BASE_DIR") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_dataset_dir_with(["kaggle_ndsb2017"]).unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// 获取目标体素边长.
///
/// 若环境变量 `$NODULE_TARGET_VOXEL_MM` 是有限正数, 则返回其值, 否则返回 0.682.
pub fn target_voxel_mm_from_env() -> f64 {
    env::var("NODULE_TARGET_VOXEL_MM")
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(TARGET_VOXEL_MM)
}

/// 构建配置. 标注表和输出目录均在根目录下, 见 [`ExtractConfig::new`].
pub fn config_from_env_or_home() -> ExtractConfig {
    ExtractConfig::new(base_dir_from_env_or_home()).with_target_voxel_mm(target_voxel_mm_from_env())
}
