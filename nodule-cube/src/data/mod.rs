use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, Ix3};

use crate::{Direction, Idx3d, Spacing};

pub mod reader;
pub mod window;

pub use window::{normalize, normalize_volume, CtWindow};

/// 单位方向矩阵.
pub const IDENTITY_DIRECTION: Direction = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// 3D CT 扫描, 包括 HU 值数据, 体素分辨率和方向矩阵. HU 值以 `f32` 保存.
///
/// 数据按 `(z, y, x)` 访问, 体素分辨率同样按 `[z, y, x]` 给出.
#[derive(Debug, Clone)]
pub struct CtVolume {
    data: Array3<f32>,
    spacing: Spacing,
    direction: Direction,
}

impl Index<Idx3d> for CtVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl CtVolume {
    /// 打开 3D CT 扫描. 根据扩展名选择读取方式, 见 [`reader::VolumeFormat`].
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        reader::read_volume(path.as_ref())
    }

    /// 根据裸数据和元信息直接创建 `CtVolume`.
    ///
    /// `data` 按 `(z, y, x)` 组织, `spacing` 按 `[z, y, x]` 给出.
    pub fn from_parts(data: Array3<f32>, spacing: Spacing, direction: Direction) -> Self {
        Self {
            data,
            spacing,
            direction,
        }
    }

    /// 用新数据和体素分辨率替换当前内容, 方向矩阵保持不变.
    ///
    /// 重采样之后使用.
    pub fn with_data(self, data: Array3<f32>, spacing: Spacing) -> Self {
        Self {
            data,
            spacing,
            direction: self.direction,
        }
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    pub fn pix_dim(&self) -> Spacing {
        self.spacing
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    pub fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.spacing;
        z == h && z == w
    }

    /// 方向矩阵.
    #[inline]
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// 方向矩阵的每个元素是否都与单位矩阵相差不超过 `tol`?
    pub fn is_identity_direction(&self, tol: f64) -> bool {
        self.direction
            .iter()
            .flatten()
            .zip(IDENTITY_DIRECTION.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tol)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }
}

#[cfg(test)]
mod tests {
    use super::{CtVolume, IDENTITY_DIRECTION};
    use ndarray::Array3;

    #[test]
    fn test_volume_attr() {
        let mut data = Array3::zeros((4, 5, 6));
        data[(1, 2, 3)] = 42.0;
        let v = CtVolume::from_parts(data, [2.5, 0.7, 0.7], IDENTITY_DIRECTION);
        assert_eq!(v.shape(), (4, 5, 6));
        assert_eq!(v.pix_dim(), [2.5, 0.7, 0.7]);
        assert!(!v.is_isotropic());
        assert_eq!(v[(1, 2, 3)], 42.0);
        assert_eq!(v.data()[[1, 2, 3]], 42.0);
    }

    #[test]
    fn test_identity_direction() {
        let v = CtVolume::from_parts(Array3::zeros((1, 1, 1)), [1.0; 3], IDENTITY_DIRECTION);
        assert!(v.is_identity_direction(0.0));

        let mut d = IDENTITY_DIRECTION;
        d[0][0] = -1.0;
        let v = CtVolume::from_parts(Array3::zeros((1, 1, 1)), [1.0; 3], d);
        assert!(!v.is_identity_direction(1e-6));

        d[0][0] = 1.0 + 1e-9;
        let v = CtVolume::from_parts(Array3::zeros((1, 1, 1)), [1.0; 3], d);
        assert!(v.is_identity_direction(1e-6));
    }

    #[test]
    fn test_with_data_keeps_direction() {
        let mut d = IDENTITY_DIRECTION;
        d[1][1] = -1.0;
        let v = CtVolume::from_parts(Array3::zeros((2, 2, 2)), [3.0, 1.0, 1.0], d);
        let v = v.with_data(Array3::ones((6, 2, 2)), [1.0; 3]);
        assert_eq!(v.shape(), (6, 2, 2));
        assert!(v.is_isotropic());
        assert_eq!(v.direction()[1][1], -1.0);
    }
}
