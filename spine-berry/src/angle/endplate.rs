//! 终板几何.
//!
//! 角度一律使用 "度". 图像坐标系中 y 轴向下, 因此 `atan2` 的正方向在屏幕上表现为顺时针;
//! 调用方只需保持坐标系一致即可.

use crate::anatomy::LandmarkRole;
use crate::Point2d;

/// 终板种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EndplateKind {
    /// 上终板.
    Superior,

    /// 下终板.
    Inferior,
}

impl EndplateKind {
    /// 该终板的 `(前缘, 后缘)` 角色.
    #[inline]
    pub const fn roles(&self) -> (LandmarkRole, LandmarkRole) {
        match self {
            EndplateKind::Superior => (
                LandmarkRole::SuperiorAnterior,
                LandmarkRole::SuperiorPosterior,
            ),
            EndplateKind::Inferior => (
                LandmarkRole::InferiorAnterior,
                LandmarkRole::InferiorPosterior,
            ),
        }
    }

    /// 报告中使用的后缀, 如 `"superior"`.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            EndplateKind::Superior => "superior",
            EndplateKind::Inferior => "inferior",
        }
    }
}

/// 由前缘点和后缘点构成的终板线段. 不单独存储, 总是从关键点坐标临时取出.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Endplate {
    /// 前缘点.
    pub anterior: Point2d,

    /// 后缘点.
    pub posterior: Point2d,
}

impl Endplate {
    /// 直接构建.
    #[inline]
    pub const fn new(anterior: Point2d, posterior: Point2d) -> Self {
        Self {
            anterior,
            posterior,
        }
    }

    /// 终板方向角, 见 [`endplate_angle`].
    #[inline]
    pub fn angle(&self) -> f64 {
        endplate_angle(self.anterior, self.posterior)
    }

    /// 与另一条终板之间的夹角, 见 [`angle_between`].
    #[inline]
    pub fn angle_to(&self, other: &Endplate) -> f64 {
        angle_between(self.angle(), other.angle())
    }
}

/// 从前缘指向后缘的向量相对 x 轴正方向的角度, 取值 `(-180, 180]`.
#[inline]
pub fn endplate_angle((ax, ay): Point2d, (px, py): Point2d) -> f64 {
    f64::atan2(py - ay, px - ax).to_degrees()
}

/// 两条无向直线方向角之间的夹角, 取值 `[0, 180]`.
///
/// 先取 `|angle1 - angle2|`, 若大于 180 则取 `360 - |angle1 - angle2|`.
/// 差值超过一整圈时先对 360 取模, 对 [`endplate_angle`] 的输出不起作用.
#[inline]
pub fn angle_between(angle1: f64, angle2: f64) -> f64 {
    match (angle1 - angle2).abs().rem_euclid(360.0) {
        d if d > 180.0 => 360.0 - d,
        d => d,
    }
}
