//! 合成得分图模型.
//!
//! 以参数化脊柱模板生成 102 个关键点, 再以每个关键点为中心在热图网格上生成高斯对数得分
//! `-d² / (2σ²)`. 用于冒烟测试, 演示以及消融实验中的已知真值.

use super::{check_surface, ModelConfig, ModelError, ModelInput, ScoreMapModel};
use crate::anatomy::{LandmarkId, LandmarkRole, Vertebra};
use crate::consts::{N_LANDMARKS, N_VERTEBRAE};
use crate::error::ShapeError;
use crate::heatmap::ScoreMaps;
use crate::landmarks::ModelLandmarks;
use crate::Point2d;
use ndarray::{Array2, Array3};

/// 参数化的脊柱模板. 椎骨沿图像竖直中线等距排列, 每个终板可单独倾斜.
///
/// 终板方向角按 [`crate::angle::endplate_angle`] 的约定, 即前缘指向后缘的方向.
#[derive(Clone, Debug, PartialEq)]
pub struct SpineTemplate {
    superior_tilt: [f64; N_VERTEBRAE],
    inferior_tilt: [f64; N_VERTEBRAE],
    sigma: f64,
}

impl Default for SpineTemplate {
    fn default() -> Self {
        Self::flat()
    }
}

impl SpineTemplate {
    /// 全部终板水平, 高斯宽度 1.5 个热图像素.
    pub fn flat() -> Self {
        Self {
            superior_tilt: [0.0; N_VERTEBRAE],
            inferior_tilt: [0.0; N_VERTEBRAE],
            sigma: 1.5,
        }
    }

    /// 设置某椎骨上下终板的方向角 (度).
    pub fn tilted(mut self, vertebra: Vertebra, superior: f64, inferior: f64) -> Self {
        self.superior_tilt[vertebra.index()] = superior;
        self.inferior_tilt[vertebra.index()] = inferior;
        self
    }

    /// 设置高斯宽度 (热图像素). 非正或非有限值时返回 `None`.
    pub fn with_sigma(mut self, sigma: f64) -> Option<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return None;
        }
        self.sigma = sigma;
        Some(self)
    }

    /// 高斯宽度.
    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// 模板在 `resolution × resolution` 模型空间中的关键点.
    pub fn landmarks(&self, resolution: u32) -> ModelLandmarks {
        let r = resolution as f64;
        let margin = r * 0.15;
        let pitch = (r - 2.0 * margin) / N_VERTEBRAE as f64;
        let half_height = pitch * 0.3;
        let half_width = r * 0.07;
        let cx = r / 2.0;

        let mut points = [(0.0, 0.0); N_LANDMARKS];
        for v in Vertebra::ALL {
            let i = v.index();
            let cy = margin + pitch * (i as f64 + 0.5);
            let plate = |cy: f64, tilt: f64| -> (Point2d, Point2d) {
                let (sin, cos) = tilt.to_radians().sin_cos();
                let (dx, dy) = (half_width * cos, half_width * sin);
                ((cx - dx, cy - dy), (cx + dx, cy + dy))
            };
            let (sa, sp) = plate(cy - half_height, self.superior_tilt[i]);
            let (ia, ip) = plate(cy + half_height, self.inferior_tilt[i]);
            let pl = (cx - half_width * 0.5, cy);
            let pr = (cx + half_width * 0.5, cy);
            for (role, p) in LandmarkRole::ALL.into_iter().zip([sa, sp, ia, ip, pl, pr]) {
                points[LandmarkId::new(v, role).index()] = p;
            }
        }
        ModelLandmarks::new_unchecked(Array2::from_shape_fn((N_LANDMARKS, 2), |(i, c)| match c {
            0 => points[i].0,
            _ => points[i].1,
        }))
    }

    /// 在 `(resolution / stride)²` 的热图网格上生成得分图. 网格为空时返回 `Err`.
    pub fn score_maps(&self, resolution: u32, stride: u32) -> Result<ScoreMaps<f32>, ShapeError> {
        let side = resolution.checked_div(stride).unwrap_or(0) as usize;
        let s = stride as f64;
        let centers: Vec<Point2d> = self
            .landmarks(resolution)
            .iter()
            .map(|(_, (x, y))| (x / s, y / s))
            .collect();
        let denom = 2.0 * self.sigma * self.sigma;
        let data = Array3::from_shape_fn((N_LANDMARKS, side, side), |(c, h, w)| {
            let (cx, cy) = centers[c];
            let d2 = (w as f64 - cx).powi(2) + (h as f64 - cy).powi(2);
            (-d2 / denom) as f32
        });
        ScoreMaps::<f32>::new(data)
    }
}

/// 以 [`SpineTemplate`] 为数据源的模型.
pub(crate) struct PhantomModel {
    config: ModelConfig,
    template: SpineTemplate,
}

impl PhantomModel {
    pub(crate) fn new(config: ModelConfig, template: SpineTemplate) -> Self {
        Self { config, template }
    }
}

impl ScoreMapModel for PhantomModel {
    fn produce_score_maps(&self, input: &ModelInput) -> Result<ScoreMaps<f32>, ModelError> {
        input.check(&self.config)?;
        let maps = self
            .template
            .score_maps(self.config.resolution(), self.config.stride())?;
        check_surface(&maps, &self.config)?;
        Ok(maps)
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }
}
