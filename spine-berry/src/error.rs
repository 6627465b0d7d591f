//! 运行时错误.
//!
//! 核心部分只有两类前置条件错误: 形状不符 ([`ShapeError`]) 与缩放参数非法 ([`ScaleError`]).
//! 几何退化 (如全部终板平行) 不是错误.

use std::fmt::Formatter;

/// 输入形状违反 17 × 6 的固定布局.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    /// 热图通道数不等于关键点数.
    ChannelCount {
        /// 期望的通道数.
        expected: usize,
        /// 实际的通道数.
        found: usize,
    },

    /// 关键点坐标个数不等于关键点数.
    LandmarkCount {
        /// 期望的关键点个数.
        expected: usize,
        /// 实际的关键点个数.
        found: usize,
    },

    /// 坐标数组不是 `(N, 2)` 形状. 参数为实际的列数.
    NotPairs(usize),

    /// 热图的空间尺寸为 0.
    EmptySurface,
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::ChannelCount { expected, found } => {
                write!(f, "热图通道数应为 {expected}, 实际为 {found}")
            }
            ShapeError::LandmarkCount { expected, found } => {
                write!(f, "关键点个数应为 {expected}, 实际为 {found}")
            }
            ShapeError::NotPairs(cols) => write!(f, "坐标数组应为 2 列, 实际为 {cols} 列"),
            ShapeError::EmptySurface => f.write_str("热图空间尺寸为 0"),
        }
    }
}

impl std::error::Error for ShapeError {}

/// 坐标缩放参数非法.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleError {
    /// 原图宽或高为 0.
    NonPositiveDimension,

    /// 模型分辨率为 0.
    NonPositiveResolution,
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::NonPositiveDimension => f.write_str("原图宽高必须为正"),
            ScaleError::NonPositiveResolution => f.write_str("模型分辨率必须为正"),
        }
    }
}

impl std::error::Error for ScaleError {}
