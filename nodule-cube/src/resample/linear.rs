use ndarray::{s, Array3, ArrayView3, Axis, Zip};

use super::{is_positive, scaled_len, PlaneStackResize, ResampleError};
use crate::consts::MAX_RESIZE_CHANNELS;

/// 一个输出下标对应的两个输入下标和后者的权重.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Tap {
    i0: usize,
    i1: usize,
    w: f32,
}

/// 计算一条轴上的插值系数.
///
/// 采用像素中心对齐: `src = (dst + 0.5) / factor - 0.5`, 越界时取边缘像素.
fn taps(src_len: usize, factor: f64) -> Vec<Tap> {
    let last = src_len - 1;
    (0..scaled_len(src_len, factor))
        .map(|dst| {
            let src = (dst as f64 + 0.5) / factor - 0.5;
            let floor = src.floor();
            if floor < 0.0 {
                Tap { i0: 0, i1: 0, w: 0.0 }
            } else if floor as usize >= last {
                Tap {
                    i0: last,
                    i1: last,
                    w: 0.0,
                }
            } else {
                let i0 = floor as usize;
                Tap {
                    i0,
                    i1: i0 + 1,
                    w: (src - floor) as f32,
                }
            }
        })
        .collect()
}

/// 双线性插值平面栈缩放.
///
/// 与常见 2D 图像库的线性缩放保持一致, 默认最多处理 [`MAX_RESIZE_CHANNELS`] 个通道.
///
/// 输入输出均为 `f32`, 两趟缩放之间不取整, 只在写入记录时四舍五入一次.
/// 与直接在 `i16` 数据上逐趟缩放 (每趟都取整) 相比, 个别体素可能相差 1 HU.
#[derive(Copy, Clone, Debug)]
pub struct LinearResize {
    max_channels: usize,
}

impl Default for LinearResize {
    #[inline]
    fn default() -> Self {
        Self {
            max_channels: MAX_RESIZE_CHANNELS,
        }
    }
}

impl LinearResize {
    /// 以自定义通道上限构建. 主要用于测试拆分逻辑.
    #[inline]
    pub fn with_max_channels(max_channels: usize) -> Self {
        Self { max_channels }
    }
}

impl PlaneStackResize for LinearResize {
    #[inline]
    fn max_channels(&self) -> usize {
        self.max_channels
    }

    fn resize(&self, stack: ArrayView3<f32>, fy: f64, fx: f64) -> Result<Array3<f32>, ResampleError> {
        let (rows, cols, channels) = stack.dim();
        if channels > self.max_channels {
            return Err(ResampleError::TooManyChannels {
                channels,
                max: self.max_channels,
            });
        }
        for f in [fy, fx] {
            if !is_positive(f) {
                return Err(ResampleError::InvalidScale(f));
            }
        }
        if rows == 0 || cols == 0 || channels == 0 {
            return Err(ResampleError::EmptyStack);
        }

        let ty = taps(rows, fy);
        let tx = taps(cols, fx);
        let mut out = Array3::<f32>::zeros((ty.len(), tx.len(), channels));

        for (mut plane, y) in out.axis_iter_mut(Axis(0)).zip(&ty) {
            for (lane, x) in plane.axis_iter_mut(Axis(0)).zip(&tx) {
                let (wy, wx) = (y.w, x.w);
                Zip::from(lane)
                    .and(stack.slice(s![y.i0, x.i0, ..]))
                    .and(stack.slice(s![y.i0, x.i1, ..]))
                    .and(stack.slice(s![y.i1, x.i0, ..]))
                    .and(stack.slice(s![y.i1, x.i1, ..]))
                    .for_each(|o, &a, &b, &c, &d| {
                        let top = a + (b - a) * wx;
                        let bottom = c + (d - c) * wx;
                        *o = top + (bottom - top) * wy;
                    });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{taps, LinearResize, Tap};
    use crate::resample::{PlaneStackResize, ResampleError};
    use ndarray::{Array3, Axis};

    fn f32_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn column(values: &[f32]) -> Array3<f32> {
        Array3::from_shape_vec((values.len(), 1, 1), values.to_vec()).unwrap()
    }

    #[test]
    fn test_taps_identity() {
        let t = taps(4, 1.0);
        assert_eq!(t.len(), 4);
        assert_eq!(t[0], Tap { i0: 0, i1: 1, w: 0.0 });
        assert_eq!(t[3], Tap { i0: 3, i1: 3, w: 0.0 });
    }

    #[test]
    fn test_upsample_rows() {
        let r = LinearResize::default();
        let out = r.resize(column(&[0.0, 10.0]).view(), 2.0, 1.0).unwrap();
        let got: Vec<f32> = out.iter().copied().collect();
        let expect = [0.0, 2.5, 7.5, 10.0];
        assert_eq!(got.len(), 4);
        assert!(got.iter().zip(expect).all(|(&a, b)| f32_eq(a, b)));
    }

    #[test]
    fn test_downsample_rows() {
        let r = LinearResize::default();
        let out = r
            .resize(column(&[0.0, 10.0, 20.0, 30.0]).view(), 0.5, 1.0)
            .unwrap();
        let got: Vec<f32> = out.iter().copied().collect();
        assert_eq!(got.len(), 2);
        assert!(f32_eq(got[0], 5.0));
        assert!(f32_eq(got[1], 25.0));
    }

    #[test]
    fn test_columns_and_channels_independent() {
        // 2 个通道, 一行两列.
        let stack = Array3::from_shape_vec((1, 2, 2), vec![0.0, 100.0, 10.0, 200.0]).unwrap();
        let out = LinearResize::default().resize(stack.view(), 1.0, 2.0).unwrap();
        assert_eq!(out.dim(), (1, 4, 2));
        let c0: Vec<f32> = out.index_axis(Axis(2), 0).iter().copied().collect();
        let c1: Vec<f32> = out.index_axis(Axis(2), 1).iter().copied().collect();
        assert!(c0.iter().zip([0.0, 2.5, 7.5, 10.0]).all(|(&a, b)| f32_eq(a, b)));
        assert!(c1.iter().zip([100.0, 125.0, 175.0, 200.0]).all(|(&a, b)| f32_eq(a, b)));
    }

    #[test]
    fn test_rounded_extent() {
        let stack = Array3::<f32>::zeros((10, 3, 1));
        let out = LinearResize::default().resize(stack.view(), 1.25, 0.1).unwrap();
        // round(12.5) = 13, round(0.3) = 0 -> 1
        assert_eq!(out.dim(), (13, 1, 1));
    }

    #[test]
    fn test_resize_errors() {
        let r = LinearResize::with_max_channels(2);
        let stack = Array3::<f32>::zeros((2, 2, 3));
        assert!(matches!(
            r.resize(stack.view(), 1.0, 1.0),
            Err(ResampleError::TooManyChannels { channels: 3, max: 2 })
        ));

        let stack = Array3::<f32>::zeros((2, 2, 1));
        assert!(matches!(
            r.resize(stack.view(), -1.0, 1.0),
            Err(ResampleError::InvalidScale(_))
        ));

        let stack = Array3::<f32>::zeros((0, 2, 1));
        assert!(matches!(
            r.resize(stack.view(), 1.0, 1.0),
            Err(ResampleError::EmptyStack)
        ));
    }
}
