//! 模型抽象.
//!
//! 本 crate 不做网络推理, 只消费模型的输出约定: 对 `resolution × resolution` 的灰度输入,
//! 产出 `(102, resolution / stride, resolution / stride)` 的得分图堆栈.
//! 不同的骨干网络 (或数据来源) 通过 [`Backbone`] 在构建时选择, 对调用方透明.

mod archive;
mod phantom;
mod slot;

pub use archive::{NpzArchive, OpenArchiveError};
pub use phantom::SpineTemplate;
pub use slot::ModelSlot;

use crate::consts::{HEATMAP_STRIDE, MODEL_RESOLUTION};
use crate::error::ShapeError;
use crate::heatmap::ScoreMaps;
use crate::preprocess::ModelPixels;
use crate::Idx2d;
use std::fmt::Formatter;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// 模型相关错误.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// 输入形状与模型分辨率不符.
    InputShape {
        /// 期望的 `(h, w)`.
        expected: Idx2d,
        /// 实际的 `(h, w)`.
        found: Idx2d,
    },

    /// 输出热图尺寸与 `resolution / stride` 不符.
    SurfaceShape {
        /// 期望的 `(H, W)`.
        expected: Idx2d,
        /// 实际的 `(H, W)`.
        found: Idx2d,
    },

    /// 输出通道数等形状错误.
    Shape(ShapeError),

    /// 打开归档失败.
    Open(String),

    /// 归档中不存在该条目.
    MissingEntry(String),

    /// 读取归档条目失败.
    Read(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InputShape { expected, found } => {
                write!(f, "模型输入应为 {expected:?}, 实际为 {found:?}")
            }
            ModelError::SurfaceShape { expected, found } => {
                write!(f, "热图尺寸应为 {expected:?}, 实际为 {found:?}")
            }
            ModelError::Shape(e) => write!(f, "模型输出形状错误: {e}"),
            ModelError::Open(e) => write!(f, "无法打开得分图归档: {e}"),
            ModelError::MissingEntry(name) => write!(f, "归档中不存在条目 `{name}`"),
            ModelError::Read(e) => write!(f, "读取得分图失败: {e}"),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<ShapeError> for ModelError {
    fn from(e: ShapeError) -> Self {
        ModelError::Shape(e)
    }
}

/// 骨干网络 (得分图来源) 选择.
#[derive(Clone, Debug, PartialEq)]
pub enum Backbone {
    /// 由参数化脊柱模板合成高斯得分图. 总是可用.
    Phantom(SpineTemplate),

    /// 外部模型预先导出的得分图归档 (`.npz`), 条目名为 `{输入名}.npy`.
    Archive {
        /// 归档路径.
        path: PathBuf,
        /// 并行读取通道数, 最大为 64.
        workers: NonZeroUsize,
    },
}

impl Default for Backbone {
    fn default() -> Self {
        Backbone::Phantom(SpineTemplate::default())
    }
}

/// 模型配置.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    resolution: u32,
    stride: u32,
    backbone: Backbone,
}

impl ModelConfig {
    /// 构建配置. `resolution` 或 `stride` 为 0, 或 `stride` 不能整除 `resolution` 时返回 `None`.
    pub fn new(resolution: u32, stride: u32, backbone: Backbone) -> Option<Self> {
        if resolution == 0 || stride == 0 || resolution % stride != 0 {
            return None;
        }
        Some(Self {
            resolution,
            stride,
            backbone,
        })
    }

    /// 默认分辨率与步长下的配置.
    pub fn with_backbone(backbone: Backbone) -> Self {
        Self {
            resolution: MODEL_RESOLUTION as u32,
            stride: HEATMAP_STRIDE as u32,
            backbone,
        }
    }

    /// 模型输入边长.
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// 热图下采样倍率.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// 模型输入形状 `(h, w)`.
    #[inline]
    pub fn input_shape(&self) -> Idx2d {
        (self.resolution as usize, self.resolution as usize)
    }

    /// 热图形状 `(H, W)`.
    #[inline]
    pub fn surface_shape(&self) -> Idx2d {
        let side = (self.resolution / self.stride) as usize;
        (side, side)
    }

    /// 骨干网络.
    #[inline]
    pub fn backbone(&self) -> &Backbone {
        &self.backbone
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::with_backbone(Backbone::default())
    }
}

/// 一次推理的输入.
#[derive(Clone, Debug)]
pub struct ModelInput {
    name: String,
    pixels: ModelPixels,
}

impl ModelInput {
    /// `name` 用于在归档中定位条目; `pixels` 为预处理后的灰度数组.
    pub fn new<S: Into<String>>(name: S, pixels: ModelPixels) -> Self {
        Self {
            name: name.into(),
            pixels,
        }
    }

    /// 输入名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 灰度数组.
    #[inline]
    pub fn pixels(&self) -> &ModelPixels {
        &self.pixels
    }

    /// 检查输入形状是否与 `config` 一致.
    pub fn check(&self, config: &ModelConfig) -> Result<(), ModelError> {
        let found = self.pixels.dim();
        let expected = config.input_shape();
        if found != expected {
            return Err(ModelError::InputShape { expected, found });
        }
        Ok(())
    }
}

/// 模型能力: 灰度输入 -> 102 通道得分图.
///
/// 实现必须可以在多个线程间共享, 并发调用互不影响.
pub trait ScoreMapModel: Send + Sync {
    /// 产出得分图堆栈, 形状为 `(102, H, W)`, `(H, W)` 等于 [`ModelConfig::surface_shape`].
    fn produce_score_maps(&self, input: &ModelInput) -> Result<ScoreMaps<f32>, ModelError>;

    /// 模型配置.
    fn config(&self) -> &ModelConfig;
}

/// 检查模型输出的热图尺寸.
pub(crate) fn check_surface(maps: &ScoreMaps<f32>, config: &ModelConfig) -> Result<(), ModelError> {
    let found = maps.surface_shape();
    let expected = config.surface_shape();
    if found != expected {
        return Err(ModelError::SurfaceShape { expected, found });
    }
    Ok(())
}

/// 按配置构建模型.
pub fn load_model(config: ModelConfig) -> Result<Box<dyn ScoreMapModel>, ModelError> {
    enum Source {
        Phantom(SpineTemplate),
        Archive(NpzArchive),
    }

    let source = match config.backbone() {
        Backbone::Phantom(template) => Source::Phantom(template.clone()),
        Backbone::Archive { path, workers } => {
            let archive = NpzArchive::new(*workers, path).map_err(|e| ModelError::Open(e.to_string()))?;
            log::info!(
                "得分图归档已打开: {} ({} 个条目, {} 个读取通道)",
                path.display(),
                archive.entry_len(),
                archive.worker_len()
            );
            Source::Archive(archive)
        }
    };
    let model: Box<dyn ScoreMapModel> = match source {
        Source::Phantom(template) => Box::new(phantom::PhantomModel::new(config, template)),
        Source::Archive(archive) => Box::new(archive::ArchiveModel::new(config, archive)),
    };
    log::info!(
        "模型已加载: resolution = {}, stride = {}",
        model.config().resolution(),
        model.config().stride()
    );
    Ok(model)
}
