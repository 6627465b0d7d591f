//! 解剖结构定义: 椎骨, 关键点角色, 以及 `(椎骨, 角色)` 与稠密索引之间的双射.
//!
//! 所有关键点按 "椎骨优先" 的顺序排列: 第 `i` 个关键点属于第 `i / 6` 个椎骨,
//! 角色为 `i % 6`.

use crate::consts::offset;
use crate::consts::{N_LANDMARKS, N_ROLES, N_THORACIC, N_VERTEBRAE};
use std::fmt::Formatter;

/// 脊柱区段.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Region {
    /// 胸椎 (T1 ~ T12).
    Thoracic,

    /// 腰椎 (L1 ~ L5).
    Lumbar,
}

macro_rules! define_vertebrae {
    ($($v: ident),+ $(,)?) => {
        /// 椎骨标识. 变体顺序即解剖顺序 (自上而下).
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub enum Vertebra {
            $(
                #[allow(missing_docs)]
                $v,
            )+
        }

        impl Vertebra {
            /// 按解剖顺序排列的全部椎骨.
            pub const ALL: [Vertebra; N_VERTEBRAE] = [$(Vertebra::$v),+];

            /// 椎骨名称, 如 `"T1"`, `"L5"`.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Vertebra::$v => stringify!($v),)+
                }
            }
        }
    };
}

define_vertebrae!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, L1, L2, L3, L4, L5);

impl Vertebra {
    /// 第一节胸椎.
    pub const FIRST_THORACIC: Vertebra = Vertebra::T1;

    /// 最后一节胸椎.
    pub const LAST_THORACIC: Vertebra = Vertebra::T12;

    /// 第一节腰椎.
    pub const FIRST_LUMBAR: Vertebra = Vertebra::L1;

    /// 最后一节腰椎.
    pub const LAST_LUMBAR: Vertebra = Vertebra::L5;

    /// 解剖顺序下的索引, `0..17`.
    #[inline]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// 从索引构建. 越界时返回 `None`.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 所属区段.
    #[inline]
    pub const fn region(&self) -> Region {
        if self.index() < N_THORACIC {
            Region::Thoracic
        } else {
            Region::Lumbar
        }
    }
}

impl std::fmt::Display for Vertebra {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 椎骨上关键点的角色. 判别值即其在椎骨内的偏移量, 见 [`crate::consts::offset`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(usize)]
pub enum LandmarkRole {
    /// 上终板前缘.
    SuperiorAnterior = offset::SUP_ANT,

    /// 上终板后缘.
    SuperiorPosterior = offset::SUP_POST,

    /// 下终板前缘.
    InferiorAnterior = offset::INF_ANT,

    /// 下终板后缘.
    InferiorPosterior = offset::INF_POST,

    /// 左椎弓根.
    PedicleLeft = offset::PEDICLE_LEFT,

    /// 右椎弓根.
    PedicleRight = offset::PEDICLE_RIGHT,
}

impl LandmarkRole {
    /// 按偏移量排列的全部角色.
    pub const ALL: [LandmarkRole; N_ROLES] = [
        LandmarkRole::SuperiorAnterior,
        LandmarkRole::SuperiorPosterior,
        LandmarkRole::InferiorAnterior,
        LandmarkRole::InferiorPosterior,
        LandmarkRole::PedicleLeft,
        LandmarkRole::PedicleRight,
    ];

    /// 椎骨内偏移量, `0..6`.
    #[inline]
    pub const fn offset(&self) -> usize {
        *self as usize
    }

    /// 从偏移量构建. 越界时返回 `None`.
    #[inline]
    pub fn from_offset(offset: usize) -> Option<Self> {
        Self::ALL.get(offset).copied()
    }

    /// 对外报告使用的 snake_case 名称.
    pub const fn name(&self) -> &'static str {
        match self {
            LandmarkRole::SuperiorAnterior => "superior_anterior",
            LandmarkRole::SuperiorPosterior => "superior_posterior",
            LandmarkRole::InferiorAnterior => "inferior_anterior",
            LandmarkRole::InferiorPosterior => "inferior_posterior",
            LandmarkRole::PedicleLeft => "pedicle_left",
            LandmarkRole::PedicleRight => "pedicle_right",
        }
    }
}

/// 单个关键点的标识, 与 `0..102` 的稠密索引一一对应.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LandmarkId {
    /// 所属椎骨.
    pub vertebra: Vertebra,

    /// 在椎骨内的角色.
    pub role: LandmarkRole,
}

impl LandmarkId {
    /// 直接构建.
    #[inline]
    pub const fn new(vertebra: Vertebra, role: LandmarkRole) -> Self {
        Self { vertebra, role }
    }

    /// 稠密索引: `vertebra * 6 + role`.
    #[inline]
    pub const fn index(&self) -> usize {
        self.vertebra.index() * N_ROLES + self.role.offset()
    }

    /// 从稠密索引还原. `index >= 102` 时返回 `None`.
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= N_LANDMARKS {
            return None;
        }
        Some(Self {
            vertebra: Vertebra::from_index(index / N_ROLES)?,
            role: LandmarkRole::from_offset(index % N_ROLES)?,
        })
    }

    /// 按稠密索引顺序迭代全部关键点.
    pub fn iter() -> impl Iterator<Item = LandmarkId> {
        Vertebra::ALL.into_iter().flat_map(|v| {
            LandmarkRole::ALL
                .into_iter()
                .map(move |r| LandmarkId::new(v, r))
        })
    }

    /// 完整名称, 如 `"T1_superior_anterior"`.
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.vertebra.name(), self.role.name())
    }
}

impl From<(Vertebra, LandmarkRole)> for LandmarkId {
    #[inline]
    fn from((vertebra, role): (Vertebra, LandmarkRole)) -> Self {
        Self::new(vertebra, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::offset::*;

    #[test]
    fn test_vertebra_order() {
        assert_eq!(Vertebra::ALL.len(), 17);
        assert_eq!(Vertebra::T1.index(), 0);
        assert_eq!(Vertebra::T12.index(), 11);
        assert_eq!(Vertebra::L1.index(), 12);
        assert_eq!(Vertebra::L5.index(), 16);
        assert_eq!(Vertebra::from_index(17), None);

        let names: Vec<_> = Vertebra::ALL.iter().map(|v| v.name()).collect();
        assert_eq!(names[0], "T1");
        assert_eq!(names[9], "T10");
        assert_eq!(names[16], "L5");
    }

    #[test]
    fn test_vertebra_region() {
        assert!(Vertebra::ALL[..12]
            .iter()
            .all(|v| v.region() == Region::Thoracic));
        assert!(Vertebra::ALL[12..]
            .iter()
            .all(|v| v.region() == Region::Lumbar));
    }

    #[test]
    fn test_role_offsets_match_consts() {
        assert_eq!(LandmarkRole::SuperiorAnterior.offset(), SUP_ANT);
        assert_eq!(LandmarkRole::SuperiorPosterior.offset(), SUP_POST);
        assert_eq!(LandmarkRole::InferiorAnterior.offset(), INF_ANT);
        assert_eq!(LandmarkRole::InferiorPosterior.offset(), INF_POST);
        assert_eq!(LandmarkRole::PedicleLeft.offset(), PEDICLE_LEFT);
        assert_eq!(LandmarkRole::PedicleRight.offset(), PEDICLE_RIGHT);
    }

    /// 索引与 `(椎骨, 角色)` 之间是双射.
    #[test]
    fn test_landmark_id_bijection() {
        for i in 0..N_LANDMARKS {
            let id = LandmarkId::from_index(i).unwrap();
            assert_eq!(id.index(), i);
            assert_eq!(id.vertebra.index(), i / 6);
            assert_eq!(id.role.offset(), i % 6);
        }
        assert_eq!(LandmarkId::from_index(N_LANDMARKS), None);

        let all: Vec<_> = LandmarkId::iter().map(|id| id.index()).collect();
        assert_eq!(all, (0..N_LANDMARKS).collect::<Vec<_>>());
    }

    #[test]
    fn test_landmark_full_name() {
        let id = LandmarkId::new(Vertebra::T1, LandmarkRole::SuperiorAnterior);
        assert_eq!(id.full_name(), "T1_superior_anterior");
        let id: LandmarkId = (Vertebra::L5, LandmarkRole::PedicleRight).into();
        assert_eq!(id.index(), 101);
        assert_eq!(id.full_name(), "L5_pedicle_right");
    }
}
