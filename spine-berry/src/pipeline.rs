//! 整体流程.
//!
//! 图像字节 -> 预处理 -> 模型得分图 -> soft-argmax 解码 (模型空间) -> 角度计算 (模型空间)
//! 与坐标缩放 (原图空间) -> 组装结果.
//!
//! 所有函数都只读取输入, 同一个模型句柄可以被多个线程同时使用.

use crate::analysis::Analysis;
use crate::angle::compute_all_angles;
use crate::error::ScaleError;
use crate::heatmap::ScoreMaps;
use crate::landmarks::{ImageSize, ModelLandmarks};
use crate::model::{ModelConfig, ModelError, ModelInput, ScoreMapModel};
use crate::preprocess::{preprocess_image, PreprocessError};
use std::fmt::Formatter;

/// 分析流程错误.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    /// 预处理失败.
    Preprocess(PreprocessError),

    /// 模型失败.
    Model(ModelError),

    /// 坐标缩放失败.
    Scale(ScaleError),
}

impl std::fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzeError::Preprocess(e) => write!(f, "预处理失败: {e}"),
            AnalyzeError::Model(e) => write!(f, "模型失败: {e}"),
            AnalyzeError::Scale(e) => write!(f, "坐标缩放失败: {e}"),
        }
    }
}

impl std::error::Error for AnalyzeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalyzeError::Preprocess(e) => Some(e),
            AnalyzeError::Model(e) => Some(e),
            AnalyzeError::Scale(e) => Some(e),
        }
    }
}

impl From<PreprocessError> for AnalyzeError {
    fn from(e: PreprocessError) -> Self {
        AnalyzeError::Preprocess(e)
    }
}

impl From<ModelError> for AnalyzeError {
    fn from(e: ModelError) -> Self {
        AnalyzeError::Model(e)
    }
}

impl From<ScaleError> for AnalyzeError {
    fn from(e: ScaleError) -> Self {
        AnalyzeError::Scale(e)
    }
}

/// 分析一张编码后的图像. `name` 为输入名 (归档模型以此查表).
pub fn analyze_image(
    model: &dyn ScoreMapModel,
    name: &str,
    bytes: &[u8],
) -> Result<Analysis, AnalyzeError> {
    let config = model.config();
    let (pixels, size) = preprocess_image(bytes, config.resolution())?;
    log::debug!(
        "{name}: 原图 {}x{}, 模型输入 {:?}",
        size.width(),
        size.height(),
        pixels.dim()
    );
    let maps = model.produce_score_maps(&ModelInput::new(name, pixels))?;
    analyze_score_maps(&maps, config, size)
}

/// 从模型得分图开始分析.
pub fn analyze_score_maps(
    maps: &ScoreMaps<f32>,
    config: &ModelConfig,
    size: ImageSize,
) -> Result<Analysis, AnalyzeError> {
    let landmarks = decode(maps, config);
    let non_finite = landmarks.non_finite();
    if !non_finite.is_empty() {
        let names: Vec<_> = non_finite.iter().map(|id| id.full_name()).collect();
        log::warn!("{} 个关键点坐标非有限值: {}", names.len(), names.join(", "));
    }

    let source = landmarks.rescale(size, config.resolution() as usize)?;
    let angles = compute_all_angles(&landmarks);
    log::info!(
        "Cobb {}° ({}-{}), 后凸 {}°, 前凸 {}°",
        angles.cobb().angle(),
        angles.cobb().upper_vertebra(),
        angles.cobb().lower_vertebra(),
        angles.kyphosis().angle(),
        angles.lordosis().angle()
    );
    Ok(Analysis::assemble(&source, angles, size))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        fn decode(maps: &ScoreMaps<f32>, config: &ModelConfig) -> ModelLandmarks {
            maps.par_decode(config.input_shape())
        }
    } else {
        fn decode(maps: &ScoreMaps<f32>, config: &ModelConfig) -> ModelLandmarks {
            maps.decode(config.input_shape())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anatomy::Vertebra;
    use crate::model::{load_model, Backbone, ModelSlot, SpineTemplate};
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use ndarray::Array3;
    use std::io::Cursor;
    use std::sync::Arc;
    use threadpool::ThreadPool;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn scoliotic() -> ModelConfig {
        let template = SpineTemplate::flat()
            .tilted(Vertebra::T1, 20.0, 0.0)
            .tilted(Vertebra::L5, 0.0, -10.0);
        ModelConfig::with_backbone(Backbone::Phantom(template))
    }

    #[test]
    fn test_analyze_image_phantom() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
        let model = load_model(scoliotic()).unwrap();
        let analysis = analyze_image(model.as_ref(), "demo", &png(300, 600)).unwrap();

        assert_eq!(analysis.image_size(), ImageSize::new(300, 600).unwrap());
        let cobb = analysis.angles().cobb();
        assert_eq!(cobb.angle(), 30.0);
        assert_eq!((cobb.upper_vertebra(), cobb.lower_vertebra()), ("T1", "L5"));
        assert_eq!(analysis.angles().segments().len(), 16);
        assert_eq!(analysis.landmarks().len(), 17);

        // 原图坐标 = 模型坐标 × (300 / 512, 600 / 512).
        let t1 = analysis.vertebra(Vertebra::T1).unwrap().landmarks().pedicle_left;
        let truth = SpineTemplate::flat().landmarks(512).point(4).unwrap();
        assert!((t1.x - truth.0 * 300.0 / 512.0).abs() <= 0.051);
        assert!((t1.y - truth.1 * 600.0 / 512.0).abs() <= 0.051);
    }

    #[test]
    fn test_analyze_errors() {
        let model = load_model(ModelConfig::default()).unwrap();
        assert_eq!(
            analyze_image(model.as_ref(), "x", &[]).unwrap_err(),
            AnalyzeError::Preprocess(PreprocessError::Empty)
        );
        assert!(matches!(
            analyze_image(model.as_ref(), "x", b"garbage"),
            Err(AnalyzeError::Preprocess(PreprocessError::Image(_)))
        ));
    }

    /// NaN 通道不会被掩盖, 流程仍然给出完整结果.
    #[test]
    fn test_nan_channel_propagates() {
        let config = ModelConfig::new(64, 4, Backbone::default()).unwrap();
        let mut data = SpineTemplate::flat().score_maps(64, 4).unwrap().into_raw();
        data.index_axis_mut(ndarray::Axis(0), 0).fill(f32::NAN);
        let maps = ScoreMaps::<f32>::new(data).unwrap();
        let analysis = analyze_score_maps(&maps, &config, ImageSize::square(64).unwrap()).unwrap();
        let t1 = analysis.vertebra(Vertebra::T1).unwrap().landmarks().superior_anterior;
        assert!(t1.x.is_nan() && t1.y.is_nan());
        // T1 上终板方向未知, 后凸角随之为 NaN; Cobb 搜索跳过含 NaN 的椎骨对.
        assert!(analysis.angles().kyphosis().angle().is_nan());
        assert!(analysis.angles().cobb().angle().is_finite());
    }

    #[test]
    fn test_flat_score_maps() {
        let config = ModelConfig::new(32, 4, Backbone::default()).unwrap();
        let maps = ScoreMaps::<f32>::new(Array3::zeros((102, 8, 8))).unwrap();
        let analysis = analyze_score_maps(&maps, &config, ImageSize::new(64, 16).unwrap()).unwrap();
        // 全等热图: 所有关键点都在网格中心, 没有可测量的弯曲.
        assert_eq!(analysis.angles().cobb().angle(), 0.0);
        assert_eq!(analysis.angles().cobb().upper_vertebra(), "");
        let p = analysis.vertebra(Vertebra::L3).unwrap().landmarks().pedicle_right;
        assert_eq!((p.x, p.y), (3.5 * 4.0 * 2.0, 3.5 * 4.0 * 0.5));
    }

    /// 一个模型句柄, 多个线程同时分析.
    #[test]
    fn test_concurrent_analyses() {
        static SLOT: ModelSlot = ModelSlot::new();
        let config = scoliotic();
        SLOT.get_or_load(&config).unwrap();

        let bytes = Arc::new(png(256, 512));
        let pool = ThreadPool::new(num_cpus::get().clamp(2, 8));
        let (tx, rx) = std::sync::mpsc::channel();
        for i in 0..8 {
            let (tx, bytes) = (tx.clone(), Arc::clone(&bytes));
            pool.execute(move || {
                let model = SLOT.get().unwrap();
                let a = analyze_image(model, &format!("img{i}"), &bytes).unwrap();
                tx.send(a).unwrap();
            });
        }
        drop(tx);
        let results: Vec<Analysis> = rx.iter().collect();
        assert_eq!(results.len(), 8);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(results[0].angles().cobb().angle(), 30.0);
    }
}
