//! nifti 格式读取.

use std::path::Path;

use ndarray::{Array3, Axis};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::data::IDENTITY_DIRECTION;
use crate::{CtVolume, Direction, Error, Idx3d, Spacing};

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 体素分辨率, 按 `[z, H, W]` 组织.
#[inline]
fn get_spacing_from_header(h: &NiftiHeader) -> Spacing {
    let [_, w, h, z, ..] = h.pixdim;
    [z.abs() as f64, h.abs() as f64, w.abs() as f64]
}

/// 从 sform 或 qform 中解析方向矩阵. 两者都未设置时返回单位矩阵.
///
/// 结果去除了体素分辨率的缩放, 按 nifti 原本的 (i, j, k) 轴组织.
fn get_direction_from_header(h: &NiftiHeader) -> Direction {
    if h.sform_code > 0 {
        let rows = [h.srow_x, h.srow_y, h.srow_z];
        let mut d = [[0.0; 3]; 3];
        for j in 0..3 {
            let norm = rows
                .iter()
                .map(|r| (r[j] as f64).powi(2))
                .sum::<f64>()
                .sqrt();
            for i in 0..3 {
                d[i][j] = if norm > 0.0 {
                    rows[i][j] as f64 / norm
                } else {
                    IDENTITY_DIRECTION[i][j]
                };
            }
        }
        d
    } else if h.qform_code > 0 {
        let (b, c, d) = (
            h.quatern_b as f64,
            h.quatern_c as f64,
            h.quatern_d as f64,
        );
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        [
            [
                a * a + b * b - c * c - d * d,
                2.0 * (b * c - a * d),
                2.0 * (b * d + a * c) * qfac,
            ],
            [
                2.0 * (b * c + a * d),
                a * a + c * c - b * b - d * d,
                2.0 * (c * d - a * b) * qfac,
            ],
            [
                2.0 * (b * d - a * c),
                2.0 * (c * d + a * b),
                (a * a + d * d - c * c - b * b) * qfac,
            ],
        ]
    } else {
        IDENTITY_DIRECTION
    }
}

/// 打开 nifti 文件格式的 3D CT 扫描. HU 值已应用 `scl_slope` 和 `scl_inter`.
///
/// 多余的尾部维度 (如长度为 1 的时间维) 会被去掉; 否则非三维数据返回 `Err`.
pub(crate) fn read(path: &Path) -> crate::Result<CtVolume> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();

    let mut data = obj.into_volume().into_ndarray::<f32>()?;
    while data.ndim() > 3 && data.len_of(Axis(data.ndim() - 1)) == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    if data.ndim() != 3 {
        return Err(Error::Dimension(data.ndim()));
    }

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data.permuted_axes([2, 1, 0].as_slice());
    let data = data.as_standard_layout().into_owned();
    let data = Array3::<f32>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())?;

    Ok(CtVolume::from_parts(
        data,
        get_spacing_from_header(&header),
        get_direction_from_header(&header),
    ))
}
