#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 从脊柱 X 光片的关键点热图中解码椎体关键点, 并计算 Cobb 角, 胸椎后凸角,
//! 腰椎前凸角与相邻节段角.
//!
//! # 注意
//!
//! 1. 该 crate 覆盖 T1 ~ L5 共 17 块椎骨, 每块 6 个关键点, 共 102 个关键点.
//!   颈椎与骶骨不在范围内.
//! 2. 该 crate 不做神经网络推理. 模型只通过其输出约定 (`(102, H, W)` 得分图) 被消费,
//!   见 [`model::ScoreMapModel`].
//! 3. 角度仅在模型空间坐标上计算. 原图空间坐标只用于展示.
//!
//! # 开发计划
//!
//! ### 解剖结构定义 ✅
//!
//! 椎骨, 关键点角色, 以及两者与稠密索引之间的双射.
//!
//! 实现位于 `spine-berry/src/anatomy.rs`.
//!
//! ### 热图 soft-argmax 解码 ✅
//!
//! 逐通道减最大值, 指数化, 归一化后求期望坐标; 支持 `f32` / `f64` 以及 `rayon` 并行.
//! 另提供硬 argmax 作为对照.
//!
//! 实现位于 `spine-berry/src/heatmap`.
//!
//! ### 终板几何与角度引擎 ✅
//!
//! 1. 终板方向角与归一化夹角. ✅
//! 2. Cobb 角穷举搜索 (136 个椎骨对). ✅
//! 3. 后凸角, 前凸角, 16 个节段角. ✅
//!
//! 实现位于 `spine-berry/src/angle`.
//!
//! ### 图像预处理, 模型抽象, 整体流程 ✅
//!
//! 实现位于 `spine-berry/src/{preprocess.rs, model, pipeline.rs}`.
//!
//! ### 关键点叠加图 ✅
//!
//! 不绘制文字.
//!
//! 实现位于 `spine-berry/src/overlay.rs`.
//!
//! ### Cobb 角搜索范围的解剖约束 ⌛️
//!
//! 目前在全部椎骨对上穷举. 是否限制为同一弯曲内的椎骨对尚无定论.

/// 二维索引 `(h, w)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 平面坐标 `(x, y)`, 图像坐标系 (y 轴向下).
pub type Point2d = (f64, f64);

pub mod consts;

pub mod anatomy;
pub mod error;
pub mod landmarks;

pub mod angle;
pub mod heatmap;

pub mod analysis;
pub mod dataset;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;

pub mod prelude;
