//! 各向异性 3D 扫描到各向同性的重采样.
//!
//! 底层依赖一个只能处理 2D 平面栈的缩放原语 ([`PlaneStackResize`]).
//! 平面栈形如 `(rows, cols, channels)`, 一次缩放只改变 `rows` 和 `cols`,
//! 且 `channels` 不能超过原语的上限. 整个 3D 重采样分两趟完成:
//!
//! 1. `(z, y, x)` 视作 `rows = z, cols = y, channels = x`, 只缩放 z;
//! 2. 重排为 `(y, x, z)`, 同时缩放 y 和 x, 最后再重排回 `(z, y, x)`.
//!
//! 任何一趟中通道数超限时, 沿通道轴对半拆分 (必要时递归), 分别缩放后按原顺序拼接.

use ndarray::{concatenate, Array3, ArrayView3, Axis, ShapeError};
use thiserror::Error;

use crate::{CtVolume, Spacing};

mod linear;

pub use linear::LinearResize;

/// 重采样错误.
#[derive(Error, Debug, Clone)]
pub enum ResampleError {
    /// 平面栈通道数超过缩放原语上限.
    #[error("{channels} channels exceed the resize limit of {max}")]
    TooManyChannels {
        /// 实际通道数.
        channels: usize,
        /// 上限.
        max: usize,
    },

    /// 缩放因子必须是有限正数.
    #[error("invalid scale factor {0}")]
    InvalidScale(f64),

    /// 体素分辨率和目标分辨率必须是有限正数.
    #[error("invalid spacing {spacing:?} for target {target}")]
    InvalidSpacing {
        /// 原体素分辨率, `[z, y, x]`.
        spacing: Spacing,
        /// 目标体素边长.
        target: f64,
    },

    /// 平面栈为空.
    #[error("cannot resize an empty stack")]
    EmptyStack,

    /// 拼接失败.
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
}

/// 2D 平面栈缩放原语.
///
/// 平面栈形如 `(rows, cols, channels)`. 每个通道独立地被缩放,
/// 输出形如 `(round(rows * fy), round(cols * fx), channels)`, 每个维度至少为 1.
pub trait PlaneStackResize {
    /// 一次调用最多能处理的通道数.
    fn max_channels(&self) -> usize;

    /// 缩放平面栈. `fy` 作用于行, `fx` 作用于列.
    ///
    /// 通道数超过 [`Self::max_channels`] 时返回 [`ResampleError::TooManyChannels`].
    fn resize(&self, stack: ArrayView3<f32>, fy: f64, fx: f64) -> Result<Array3<f32>, ResampleError>;
}

/// 缩放后的长度: `round(len * factor)`, 至少为 1.
#[inline]
pub fn scaled_len(len: usize, factor: f64) -> usize {
    ((len as f64) * factor).round().max(1.0) as usize
}

#[inline]
fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// 3D 重采样器.
#[derive(Clone, Debug, Default)]
pub struct Resampler<R = LinearResize> {
    resizer: R,
}

impl<R: PlaneStackResize> Resampler<R> {
    /// 以给定的缩放原语构建重采样器.
    #[inline]
    pub fn new(resizer: R) -> Self {
        Self { resizer }
    }

    /// 底层缩放原语.
    #[inline]
    pub fn resizer(&self) -> &R {
        &self.resizer
    }

    /// 将 `(z, y, x)` 组织的 `volume` 从体素分辨率 `spacing` (`[z, y, x]`, 毫米)
    /// 重采样到边长为 `target` 毫米的各向同性体素.
    ///
    /// 输出第 `i` 轴长度为 `round(len_i * spacing_i / target)`.
    pub fn rescale(
        &self,
        volume: ArrayView3<f32>,
        spacing: Spacing,
        target: f64,
    ) -> Result<Array3<f32>, ResampleError> {
        if !is_positive(target) || !spacing.iter().all(|&s| is_positive(s)) {
            return Err(ResampleError::InvalidSpacing { spacing, target });
        }
        let [fz, fy, fx] = spacing.map(|s| s / target);

        // (z, y, x): 行为 z, 列为 y, 通道为 x.
        let res = self.resize_split(volume, fz, 1.0)?;

        // (z', y, x) -> (y, x, z')
        let res = res.permuted_axes([1, 2, 0]);
        let res = self.resize_split(res.view(), fy, fx)?;

        // (y', x', z') -> (z', y', x')
        Ok(res.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
    }

    /// 重采样整个扫描, 返回的扫描体素分辨率为 `[target; 3]`.
    pub fn rescale_volume(&self, volume: CtVolume, target: f64) -> crate::Result<CtVolume> {
        let before = volume.shape();
        let data = self.rescale(volume.data(), volume.pix_dim(), target)?;
        log::debug!(
            "resampled {:?} @ {:?} mm -> {:?} @ {target} mm",
            before,
            volume.pix_dim(),
            data.dim()
        );
        Ok(volume.with_data(data, [target; 3]))
    }

    /// 缩放平面栈. 通道数超限时沿通道轴对半拆分, 分别缩放后按原顺序拼接.
    fn resize_split(
        &self,
        stack: ArrayView3<f32>,
        fy: f64,
        fx: f64,
    ) -> Result<Array3<f32>, ResampleError> {
        let channels = stack.len_of(Axis(2));
        if channels <= self.resizer.max_channels() || channels < 2 {
            return self.resizer.resize(stack, fy, fx);
        }

        let (first, second) = stack.split_at(Axis(2), channels / 2);
        let first = self.resize_split(first, fy, fx)?;
        let second = self.resize_split(second, fy, fx)?;
        Ok(concatenate(Axis(2), &[first.view(), second.view()])?)
    }
}
