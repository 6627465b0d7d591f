//! 一次分析的最终结果: 原图空间关键点 (按椎骨分组) + 角度报告 + 原图尺寸.
//!
//! 结果一经构建即只读. 开启 `serde` feature 后可直接序列化为下游约定的 JSON 结构:
//!
//! ```text
//! {
//!   "landmarks": [{ "vertebra": "T1", "landmarks": { "superior_anterior": {"x": .., "y": ..}, .. } }, ..],
//!   "angles": { "cobb": {..}, "kyphosis": {..}, "lordosis": {..}, "segments": [..] },
//!   "image_size": { "width": .., "height": .. }
//! }
//! ```

use crate::anatomy::{LandmarkRole, Vertebra};
use crate::angle::{round1, AngleReport};
use crate::landmarks::{ImageSize, SourceLandmarks};
use crate::Point2d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 保留一位小数的坐标.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointXY {
    /// x 坐标.
    pub x: f64,
    /// y 坐标.
    pub y: f64,
}

impl From<Point2d> for PointXY {
    fn from((x, y): Point2d) -> Self {
        Self {
            x: round1(x),
            y: round1(y),
        }
    }
}

/// 单个椎骨的 6 个关键点, 字段名即角色名, 字段顺序即角色顺序.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(missing_docs)]
pub struct RolePoints {
    pub superior_anterior: PointXY,
    pub superior_posterior: PointXY,
    pub inferior_anterior: PointXY,
    pub inferior_posterior: PointXY,
    pub pedicle_left: PointXY,
    pub pedicle_right: PointXY,
}

impl RolePoints {
    /// 按角色获取.
    pub fn get(&self, role: LandmarkRole) -> PointXY {
        match role {
            LandmarkRole::SuperiorAnterior => self.superior_anterior,
            LandmarkRole::SuperiorPosterior => self.superior_posterior,
            LandmarkRole::InferiorAnterior => self.inferior_anterior,
            LandmarkRole::InferiorPosterior => self.inferior_posterior,
            LandmarkRole::PedicleLeft => self.pedicle_left,
            LandmarkRole::PedicleRight => self.pedicle_right,
        }
    }

    /// 以角色顺序迭代 `(角色名, 坐标)`.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, PointXY)> + '_ {
        LandmarkRole::ALL.iter().map(move |&r| (r.name(), self.get(r)))
    }
}

/// 单个椎骨的结构化关键点.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertebraLandmarks {
    vertebra: String,
    landmarks: RolePoints,
}

impl VertebraLandmarks {
    fn of(landmarks: &SourceLandmarks, vertebra: Vertebra) -> Self {
        let [sa, sp, ia, ip, pl, pr] = landmarks.vertebra_points(vertebra).map(PointXY::from);
        Self {
            vertebra: vertebra.name().to_string(),
            landmarks: RolePoints {
                superior_anterior: sa,
                superior_posterior: sp,
                inferior_anterior: ia,
                inferior_posterior: ip,
                pedicle_left: pl,
                pedicle_right: pr,
            },
        }
    }

    /// 椎骨名称, 如 `"T1"`.
    #[inline]
    pub fn vertebra(&self) -> &str {
        &self.vertebra
    }

    /// 6 个关键点.
    #[inline]
    pub fn landmarks(&self) -> &RolePoints {
        &self.landmarks
    }
}

/// 一次分析的完整结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Analysis {
    landmarks: Vec<VertebraLandmarks>,
    angles: AngleReport,
    image_size: ImageSize,
}

impl Analysis {
    /// 组装结果. `landmarks` 为原图空间坐标, `angles` 由模型空间坐标计算得到.
    pub fn assemble(landmarks: &SourceLandmarks, angles: AngleReport, image_size: ImageSize) -> Self {
        Self {
            landmarks: Vertebra::ALL
                .iter()
                .map(|&v| VertebraLandmarks::of(landmarks, v))
                .collect(),
            angles,
            image_size,
        }
    }

    /// 17 个椎骨的关键点, 按解剖顺序.
    #[inline]
    pub fn landmarks(&self) -> &[VertebraLandmarks] {
        &self.landmarks
    }

    /// 某个椎骨的关键点. 由 [`Self::assemble`] 构建的结果总是 `Some`;
    /// 反序列化得到的结果缺少该椎骨时为 `None`.
    #[inline]
    pub fn vertebra(&self, vertebra: Vertebra) -> Option<&VertebraLandmarks> {
        self.landmarks.get(vertebra.index())
    }

    /// 角度报告.
    #[inline]
    pub fn angles(&self) -> &AngleReport {
        &self.angles
    }

    /// 原图尺寸.
    #[inline]
    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }
}
