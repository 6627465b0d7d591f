//! 角度报告.
//!
//! 报告一经构建即不可变. 所有角度以度为单位, 保留一位小数.
//! 序列化后的字段名 (`cobb_angle`, `upper_vertebra`, `kyphosis_angle`, ...) 是对下游的稳定约定.

use crate::anatomy::Vertebra;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 保留一位小数. NaN 保持为 NaN.
///
/// 按二进制浮点数的精确值舍入到最近的一位小数, 恰好居中时取偶数 (`12.25 -> 12.2`),
/// 而 `0.15` 的精确值略小于 0.15, 因此得到 `0.1`.
#[inline]
pub(crate) fn round1(v: f64) -> f64 {
    format!("{v:.1}").parse().unwrap_or(v)
}

/// Cobb 角及其上下端椎.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CobbAngle {
    #[cfg_attr(feature = "serde", serde(rename = "cobb_angle"))]
    angle: f64,
    upper_vertebra: String,
    lower_vertebra: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pair: Option<(Vertebra, Vertebra)>,
}

impl CobbAngle {
    /// `pair` 为 `None` 时表示没有可测量的弯曲, 此时端椎名称为空串.
    pub(crate) fn new(angle: f64, pair: Option<(Vertebra, Vertebra)>) -> Self {
        let (upper_vertebra, lower_vertebra) = match pair {
            Some((u, l)) => (u.name().to_string(), l.name().to_string()),
            None => (String::new(), String::new()),
        };
        Self {
            angle: round1(angle),
            upper_vertebra,
            lower_vertebra,
            pair,
        }
    }

    /// Cobb 角.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// 上端椎名称. 无弯曲时为空串.
    #[inline]
    pub fn upper_vertebra(&self) -> &str {
        &self.upper_vertebra
    }

    /// 下端椎名称. 无弯曲时为空串.
    #[inline]
    pub fn lower_vertebra(&self) -> &str {
        &self.lower_vertebra
    }

    /// `(上端椎, 下端椎)`. 无弯曲或反序列化得到的报告返回 `None`.
    #[inline]
    pub fn pair(&self) -> Option<(Vertebra, Vertebra)> {
        self.pair
    }
}

/// 固定椎骨对之间的角度 (后凸角 / 前凸角).
macro_rules! define_fixed_angle {
    ($(#[$doc: meta])* $name: ident, $field: literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name {
            #[cfg_attr(feature = "serde", serde(rename = $field))]
            angle: f64,
            from: String,
            to: String,
        }

        impl $name {
            pub(crate) fn new(angle: f64, from: Vertebra, to: Vertebra) -> Self {
                Self {
                    angle: round1(angle),
                    from: format!("{}_superior", from.name()),
                    to: format!("{}_inferior", to.name()),
                }
            }

            /// 角度.
            #[inline]
            pub fn angle(&self) -> f64 {
                self.angle
            }

            /// 起始终板, 如 `"T1_superior"`.
            #[inline]
            pub fn from(&self) -> &str {
                &self.from
            }

            /// 终止终板, 如 `"T12_inferior"`.
            #[inline]
            pub fn to(&self) -> &str {
                &self.to
            }
        }
    };
}

define_fixed_angle!(
    /// 胸椎后凸角: T1 上终板与 T12 下终板之间的夹角.
    KyphosisAngle,
    "kyphosis_angle"
);

define_fixed_angle!(
    /// 腰椎前凸角: L1 上终板与 L5 下终板之间的夹角.
    LordosisAngle,
    "lordosis_angle"
);

/// 相邻椎骨之间的节段角.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentAngle {
    segment: String,
    angle: f64,
}

impl SegmentAngle {
    pub(crate) fn new(upper: Vertebra, lower: Vertebra, angle: f64) -> Self {
        Self {
            segment: format!("{}-{}", upper.name(), lower.name()),
            angle: round1(angle),
        }
    }

    /// 节段标签, 如 `"T12-L1"`.
    #[inline]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// 节段角.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }
}

/// 一次请求的全部角度.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleReport {
    cobb: CobbAngle,
    kyphosis: KyphosisAngle,
    lordosis: LordosisAngle,
    segments: Vec<SegmentAngle>,
}

impl AngleReport {
    pub(crate) fn new(
        cobb: CobbAngle,
        kyphosis: KyphosisAngle,
        lordosis: LordosisAngle,
        segments: Vec<SegmentAngle>,
    ) -> Self {
        Self {
            cobb,
            kyphosis,
            lordosis,
            segments,
        }
    }

    /// Cobb 角.
    #[inline]
    pub fn cobb(&self) -> &CobbAngle {
        &self.cobb
    }

    /// 胸椎后凸角.
    #[inline]
    pub fn kyphosis(&self) -> &KyphosisAngle {
        &self.kyphosis
    }

    /// 腰椎前凸角.
    #[inline]
    pub fn lordosis(&self) -> &LordosisAngle {
        &self.lordosis
    }

    /// 16 个节段角, 按解剖顺序.
    #[inline]
    pub fn segments(&self) -> &[SegmentAngle] {
        &self.segments
    }
}
