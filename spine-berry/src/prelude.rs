//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Point2d};

pub use crate::anatomy::{LandmarkId, LandmarkRole, Region, Vertebra};
pub use crate::consts::{MODEL_RESOLUTION, N_LANDMARKS, N_VERTEBRAE};
pub use crate::error::{ScaleError, ShapeError};
pub use crate::landmarks::{ImageSize, ModelLandmarks, SourceLandmarks};

pub use crate::angle::{compute_all_angles, AngleReport, Endplate, EndplateKind};
pub use crate::heatmap::ScoreMaps;

pub use crate::analysis::Analysis;
pub use crate::model::{load_model, Backbone, ModelConfig, ModelSlot, ScoreMapModel};
pub use crate::pipeline::{analyze_image, analyze_score_maps, AnalyzeError};

pub use crate::dataset::{self, home_dataset_dir_with};
