//! 角度计算引擎.
//!
//! 四种角度共用终板几何原语, 区别只在于如何选取椎骨对:
//!
//! 1. Cobb 角: 在全部 `i < j` 的椎骨对上穷举, 取 `i` 上终板与 `j` 下终板夹角的最大值;
//! 2. 后凸角 / 前凸角: 固定椎骨对;
//! 3. 节段角: 相邻椎骨对, `i` 下终板与 `i + 1` 上终板.
//!
//! 计算过程保持全精度, 只在构建报告时保留一位小数.

use super::report::{AngleReport, CobbAngle, KyphosisAngle, LordosisAngle, SegmentAngle};
use super::{angle_between, EndplateKind};
use crate::anatomy::Vertebra;
use crate::consts::N_VERTEBRAE;
use crate::landmarks::ModelLandmarks;
use itertools::Itertools;

/// 每个椎骨上下终板的方向角缓存.
struct EndplateAngles {
    superior: [f64; N_VERTEBRAE],
    inferior: [f64; N_VERTEBRAE],
}

impl EndplateAngles {
    fn of(landmarks: &ModelLandmarks) -> Self {
        let angle = |v: Vertebra, kind| landmarks.endplate(v, kind).angle();
        Self {
            superior: Vertebra::ALL.map(|v| angle(v, EndplateKind::Superior)),
            inferior: Vertebra::ALL.map(|v| angle(v, EndplateKind::Inferior)),
        }
    }

    /// `upper` 上终板与 `lower` 下终板的夹角.
    #[inline]
    fn span(&self, upper: Vertebra, lower: Vertebra) -> f64 {
        angle_between(self.superior[upper.index()], self.inferior[lower.index()])
    }
}

/// 未取整的 Cobb 角搜索结果.
///
/// 返回 `(最大夹角, (上端椎, 下端椎))`. 若没有任何椎骨对的夹角为正, 返回 `(0.0, None)`.
///
/// 只有 **严格更大** 的夹角才会替换当前最大值, 因此多个椎骨对并列最大时,
/// 按 `i = 0..16, j = i+1..17` 的遍历顺序最先出现的那一对胜出.
/// 夹角为 NaN 的椎骨对永远不会被选中.
pub fn cobb_search(landmarks: &ModelLandmarks) -> (f64, Option<(Vertebra, Vertebra)>) {
    let angles = EndplateAngles::of(landmarks);
    let mut max_angle = 0.0;
    let mut pair = None;

    for (i, &upper) in Vertebra::ALL.iter().enumerate() {
        for &lower in &Vertebra::ALL[i + 1..] {
            let cobb = angles.span(upper, lower);
            if cobb > max_angle {
                max_angle = cobb;
                pair = Some((upper, lower));
            }
        }
    }
    (max_angle, pair)
}

/// Cobb 角.
pub fn compute_cobb_angle(landmarks: &ModelLandmarks) -> CobbAngle {
    let (angle, pair) = cobb_search(landmarks);
    CobbAngle::new(angle, pair)
}

/// `upper` 上终板与 `lower` 下终板之间的夹角, 未取整.
#[inline]
fn fixed_pair(landmarks: &ModelLandmarks, upper: Vertebra, lower: Vertebra) -> f64 {
    let sup = landmarks.endplate(upper, EndplateKind::Superior);
    let inf = landmarks.endplate(lower, EndplateKind::Inferior);
    sup.angle_to(&inf)
}

/// 胸椎后凸角: T1 上终板 ↔ T12 下终板.
pub fn compute_kyphosis(landmarks: &ModelLandmarks) -> KyphosisAngle {
    let (from, to) = (Vertebra::FIRST_THORACIC, Vertebra::LAST_THORACIC);
    KyphosisAngle::new(fixed_pair(landmarks, from, to), from, to)
}

/// 腰椎前凸角: L1 上终板 ↔ L5 下终板.
pub fn compute_lordosis(landmarks: &ModelLandmarks) -> LordosisAngle {
    let (from, to) = (Vertebra::FIRST_LUMBAR, Vertebra::LAST_LUMBAR);
    LordosisAngle::new(fixed_pair(landmarks, from, to), from, to)
}

/// 16 个相邻节段角, 按解剖顺序 (而不是角度大小) 排列.
pub fn compute_segment_angles(landmarks: &ModelLandmarks) -> Vec<SegmentAngle> {
    let angles = EndplateAngles::of(landmarks);
    Vertebra::ALL
        .iter()
        .copied()
        .tuple_windows()
        .map(|(upper, lower)| {
            let a = angle_between(
                angles.inferior[upper.index()],
                angles.superior[lower.index()],
            );
            SegmentAngle::new(upper, lower, a)
        })
        .collect()
}

/// 计算全部角度.
pub fn compute_all_angles(landmarks: &ModelLandmarks) -> AngleReport {
    AngleReport::new(
        compute_cobb_angle(landmarks),
        compute_kyphosis(landmarks),
        compute_lordosis(landmarks),
        compute_segment_angles(landmarks),
    )
}
