//! 以归一化中心提取固定大小的立方体.
//!
//! 窗口越界时整体平移, 而不是填充, 因此只要轴长不小于边长,
//! 结果在该轴上的长度就恰好等于边长.

use std::ops::Range;

use ndarray::{s, ArrayView3};

use crate::consts::CUBE_EDGE;
use crate::{Idx3d, NormCenter};

/// 计算单个轴上的提取窗口.
///
/// 中心为 `round(perc * len)` (四舍六入五成双), 初始窗口为
/// `[center - edge / 2, center + edge - edge / 2)`. 下界为负时整体上移,
/// 上界超出 `len` 时整体下移. `len < edge` 时退化为 `[0, len)`.
pub fn axis_window(perc: f64, len: usize, edge: usize) -> Range<usize> {
    let len = len as isize;
    let half = (edge / 2) as isize;
    let center = (perc * len as f64).round_ties_even() as isize;

    let mut lo = center.saturating_sub(half);
    let mut hi = center.saturating_add(edge as isize - half);
    if lo < 0 {
        hi -= lo;
        lo = 0;
    }
    if hi > len {
        lo -= hi - len;
        hi = len;
    }
    (lo.max(0) as usize)..(hi as usize)
}

/// 三个轴上的提取窗口, 按 `(z, y, x)` 组织.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CubeWindow {
    /// z 方向.
    pub z: Range<usize>,
    /// y 方向.
    pub y: Range<usize>,
    /// x 方向.
    pub x: Range<usize>,
}

impl CubeWindow {
    /// 在形如 `shape` 的数据中, 以 `center` 为中心计算边长为 `edge` 的窗口.
    pub fn new((lz, ly, lx): Idx3d, center: NormCenter, edge: usize) -> Self {
        let [cz, cy, cx] = center;
        Self {
            z: axis_window(cz, lz, edge),
            y: axis_window(cy, ly, edge),
            x: axis_window(cx, lx, edge),
        }
    }

    /// 窗口形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        (self.z.len(), self.y.len(), self.x.len())
    }

    /// 从 `volume` 中取出窗口对应的视图.
    #[inline]
    pub fn apply<'a>(&self, volume: ArrayView3<'a, f32>) -> ArrayView3<'a, f32> {
        volume.slice_move(s![self.z.clone(), self.y.clone(), self.x.clone()])
    }
}

/// 以 `center` 为中心提取 32 x 32 x 32 的立方体.
#[inline]
pub fn extract_cube(volume: ArrayView3<f32>, center: NormCenter) -> ArrayView3<f32> {
    extract_cube_with_edge(volume, center, CUBE_EDGE)
}

/// 以 `center` 为中心提取边长为 `edge` 的立方体.
pub fn extract_cube_with_edge(
    volume: ArrayView3<f32>,
    center: NormCenter,
    edge: usize,
) -> ArrayView3<f32> {
    CubeWindow::new(volume.dim(), center, edge).apply(volume)
}

#[cfg(test)]
mod tests {
    use super::{axis_window, extract_cube, extract_cube_with_edge, CubeWindow};
    use ndarray::{s, Array3};

    fn volume_64() -> Array3<f32> {
        Array3::from_shape_fn((64, 64, 64), |(z, y, x)| (z * 4096 + y * 64 + x) as f32)
    }

    #[test]
    fn test_axis_window_basic() {
        assert_eq!(axis_window(0.5, 64, 32), 16..48);
        assert_eq!(axis_window(0.0, 64, 32), 0..32);
        assert_eq!(axis_window(1.0, 64, 32), 32..64);
        assert_eq!(axis_window(0.1, 64, 32), 0..32);
        assert_eq!(axis_window(0.9, 64, 32), 32..64);
        // round(0.3 * 100) = 30
        assert_eq!(axis_window(0.3, 100, 32), 14..46);
    }

    #[test]
    fn test_axis_window_round_half_even() {
        // 0.5 * 65 = 32.5 -> 32; 0.5 * 67 = 33.5 -> 34
        assert_eq!(axis_window(0.5, 65, 32), 16..48);
        assert_eq!(axis_window(0.5, 67, 32), 18..50);
    }

    #[test]
    fn test_axis_window_always_full() {
        for len in 32..=96 {
            for i in -10..=110 {
                let perc = i as f64 / 100.0;
                let w = axis_window(perc, len, 32);
                assert_eq!(w.len(), 32, "len = {len}, perc = {perc}");
                assert!(w.end <= len);
            }
        }
    }

    #[test]
    fn test_axis_window_degenerate() {
        for len in 1..32 {
            for perc in [0.0, 0.3, 0.5, 1.0] {
                assert_eq!(axis_window(perc, len, 32), 0..len);
            }
        }
    }

    #[test]
    fn test_central_cube() {
        let v = volume_64();
        let c = extract_cube(v.view(), [0.5, 0.5, 0.5]);
        assert_eq!(c.dim(), (32, 32, 32));
        assert_eq!(c, v.slice(s![16..48, 16..48, 16..48]));
    }

    #[test]
    fn test_shifted_cube() {
        let v = volume_64();
        let c = extract_cube(v.view(), [0.0, 0.5, 0.5]);
        assert_eq!(c.dim(), (32, 32, 32));
        assert_eq!(c, v.slice(s![0..32, 16..48, 16..48]));

        let w = CubeWindow::new(v.dim(), [0.0, 0.5, 1.0], 32);
        assert_eq!(w, CubeWindow { z: 0..32, y: 16..48, x: 32..64 });
    }

    #[test]
    fn test_small_axis() {
        let v = Array3::<f32>::zeros((20, 64, 40));
        let c = extract_cube(v.view(), [0.5, 0.5, 0.5]);
        assert_eq!(c.dim(), (20, 32, 32));
    }

    #[test]
    fn test_custom_edge() {
        let v = volume_64();
        let c = extract_cube_with_edge(v.view(), [0.5, 0.5, 0.5], 8);
        assert_eq!(c.dim(), (8, 8, 8));
        assert_eq!(c[[0, 0, 0]], v[[28, 28, 28]]);
    }
}
