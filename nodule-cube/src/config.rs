//! 批处理配置.

use std::path::{Path, PathBuf};

use crate::consts::{
    ANNOTATION_TABLE, CUBE_EDGE, DIRECTION_TOLERANCE, MALIGNANCY_BUCKETS, TARGET_VOXEL_MM,
};

/// 批处理配置. 在构建 [`crate::pipeline::CubeExtractor`] 时一次性传入.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfig {
    /// 数据集根目录. 标注表中的相对扫描路径以此为基准.
    pub base_dir: PathBuf,

    /// 标注表路径.
    pub table_path: PathBuf,

    /// 输出目录.
    pub output_dir: PathBuf,

    /// 目标体素边长, 以毫米为单位.
    pub target_voxel_mm: f64,

    /// 立方体边长.
    pub cube_edge: usize,

    /// 分桶个数. 恶性程度评分 `0..bucket_count` 各对应一个输出文件.
    pub bucket_count: u8,

    /// 方向矩阵与单位矩阵比较时的容差.
    pub direction_tolerance: f64,
}

impl ExtractConfig {
    /// 以 `base_dir` 为根目录构建默认配置:
    ///
    /// 1. 标注表为 `{base_dir}/patID_x_y_z_mal.csv`;
    /// 2. 输出目录为 `{base_dir}/resources/_tfrecords`;
    /// 3. 目标体素边长 0.682 mm, 立方体边长 32, 6 个分桶.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        let base_dir = base_dir.as_ref().to_owned();
        Self {
            table_path: base_dir.join(ANNOTATION_TABLE),
            output_dir: base_dir.join("resources").join("_tfrecords"),
            base_dir,
            target_voxel_mm: TARGET_VOXEL_MM,
            cube_edge: CUBE_EDGE,
            bucket_count: MALIGNANCY_BUCKETS,
            direction_tolerance: DIRECTION_TOLERANCE,
        }
    }

    /// 替换标注表路径.
    #[inline]
    pub fn with_table_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.table_path = path.as_ref().to_owned();
        self
    }

    /// 替换输出目录.
    #[inline]
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_owned();
        self
    }

    /// 替换目标体素边长.
    #[inline]
    pub fn with_target_voxel_mm(mut self, mm: f64) -> Self {
        self.target_voxel_mm = mm;
        self
    }

    /// 替换立方体边长.
    #[inline]
    pub fn with_cube_edge(mut self, edge: usize) -> Self {
        self.cube_edge = edge;
        self
    }

    /// 替换分桶个数.
    #[inline]
    pub fn with_bucket_count(mut self, buckets: u8) -> Self {
        self.bucket_count = buckets;
        self
    }
}
