use ndarray::{Array3, ArrayView3};

use crate::consts::hu::{LEVEL, WIDTH};

/// CT 窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct CtWindow {
    level: f32,
    width: f32,
}

impl CtWindow {
    /// 构建 CT 窗.
    ///
    /// `level` 和 `width` 必须在合理范围内, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<CtWindow> {
        if (-1e5..=1e5).contains(&level) && 0.0 < width && width <= 1e5 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 构建肺结节常用的 CT 窗口, 即 \[-1000, 400\]. 该窗口的窗位为
    /// -300, 窗宽为 1400.
    #[inline]
    pub const fn from_lung_nodule() -> CtWindow {
        Self {
            level: LEVEL,
            width: WIDTH,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前 CT 窗设置下, `ct` HU 值线性映射到 \[-0.5, 0.5\] 的结果.
    /// 窗下限以下为 -0.5, 窗上限以上为 0.5.
    ///
    /// 如果 `ct` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_centered(&self, ct: f32) -> Option<f32> {
        if !ct.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if ct <= lb {
            Some(-0.5)
        } else if ct >= self.upper_bound() {
            Some(0.5)
        } else {
            Some((ct - lb) / self.width() - 0.5)
        }
    }
}

/// 以肺结节窗口 \[-1000, 400\] 归一化单个 HU 值到 \[-0.5, 0.5\].
///
/// NaN 原样返回.
#[inline]
pub fn normalize(hu: f32) -> f32 {
    const WINDOW: CtWindow = CtWindow::from_lung_nodule();
    match WINDOW.eval_centered(hu) {
        Some(v) => v,
        None if hu.is_nan() => hu,
        None if hu > 0.0 => 0.5,
        None => -0.5,
    }
}

/// 以肺结节窗口归一化整个 3D 数组. 不修改输入.
pub fn normalize_volume(volume: ArrayView3<f32>) -> Array3<f32> {
    volume.mapv(normalize)
}
