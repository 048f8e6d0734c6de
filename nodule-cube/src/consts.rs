//! 通用常量.

/// 默认的目标体素边长 (各向同性), 以毫米为单位.
pub const TARGET_VOXEL_MM: f64 = 0.682;

/// 立方体边长.
pub const CUBE_EDGE: usize = 32;

/// 底层 2D 缩放一次最多能处理的通道数.
pub const MAX_RESIZE_CHANNELS: usize = 512;

/// 恶性程度分桶个数. 评分 `0..MALIGNANCY_BUCKETS` 各对应一个输出文件.
pub const MALIGNANCY_BUCKETS: u8 = 6;

/// 输出文件扩展名.
pub const RECORD_EXTENSION: &str = "tfrecord";

/// 默认标注表文件名.
pub const ANNOTATION_TABLE: &str = "patID_x_y_z_mal.csv";

/// 方向矩阵与单位矩阵比较时的默认容差.
pub const DIRECTION_TOLERANCE: f64 = 1e-6;

/// 肺结节 CT 窗口.
pub mod hu {
    /// 窗下限 (HU).
    pub const MIN_BOUND: f32 = -1000.0;

    /// 窗上限 (HU).
    pub const MAX_BOUND: f32 = 400.0;

    /// 窗位.
    pub const LEVEL: f32 = (MIN_BOUND + MAX_BOUND) / 2.0;

    /// 窗宽.
    pub const WIDTH: f32 = MAX_BOUND - MIN_BOUND;
}
