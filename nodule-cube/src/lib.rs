#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 将肺部 3D CT 扫描按结节标注切分为固定大小的训练样本.
//!
//! 对每个病人, 流程如下:
//!
//! 1. 打开 3D CT 扫描 (nifti 或 MetaImage), 检查方向矩阵 (仅警告);
//! 2. 重采样到各向同性的体素分辨率, 默认 0.682 mm;
//! 3. 按 `z_center` 升序遍历该病人的所有结节标注, 以归一化中心切出
//!   32 x 32 x 32 的立方体;
//! 4. 根据恶性程度评分 (0 ~ 5) 写入对应的 `<patient_id>_<score>.tfrecord` 文件.
//!
//! # 注意
//!
//! 1. 所有坐标均按 `(z, y, x)` 组织, 即 (切片方向, 自然图像垂直方向, 自然图像水平方向).
//!   体素分辨率 (spacing) 同样按该顺序给出.
//! 2. 程序完全串行执行, 不提供并发.
//!
//! # 模块
//!
//! ### 重采样 ✅
//!
//! 底层 2D 缩放只能处理通道数有限的平面栈, 超限时对半拆分后再拼接.
//!
//! 实现位于 `nodule-cube/src/resample`.
//!
//! ### 立方体提取 ✅
//!
//! 靠近边缘时整体平移窗口, 而不是填充.
//!
//! 实现位于 `nodule-cube/src/cube.rs`.
//!
//! ### 记录序列化与分桶写入 ✅
//!
//! 实现位于 `nodule-cube/src/record`.
//!
//! ### CT 窗口归一化 ✅
//!
//! 将 HU 值按 \[-1000, 400\] 窗口映射到 \[-0.5, 0.5\].
//! 目前不在提取流程中调用.
//!
//! 实现位于 `nodule-cube/src/data/window.rs`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 体素分辨率, 以毫米为单位, 按 `[z, y, x]` 组织.
pub type Spacing = [f64; 3];

/// 3 x 3 方向矩阵, 行优先.
pub type Direction = [[f64; 3]; 3];

/// 归一化中心. 每个分量都是该轴长度的百分比, 按 `[z, y, x]` 组织.
pub type NormCenter = [f64; 3];

pub mod consts;

/// 3D CT 扫描基础数据结构与读取.
mod data;

pub use data::{normalize, normalize_volume, reader, CtVolume, CtWindow, IDENTITY_DIRECTION};

pub mod config;
pub mod cube;
pub mod dataset;
mod error;
pub mod pipeline;
pub mod prelude;
pub mod record;
pub mod resample;

pub use config::ExtractConfig;
pub use error::{Error, Result};
