mod profile;

use spine_berry::prelude::*;
use spine_berry::model::NpzArchive;
use spine_berry::overlay::draw_landmarks;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use utils::loader;

pub use profile::Profile;

/// 报告输出位置.
pub struct Reports {
    out: PathBuf,
    images: Option<PathBuf>,
}

impl Reports {
    pub fn new(out: PathBuf, images: Option<PathBuf>) -> Self {
        Self { out, images }
    }

    /// 输出 `{name}.json`; 若存在同名原图, 以原图尺寸缩放坐标并输出叠加图 `{name}.png`.
    fn write(&self, name: &str, landmarks: &ModelLandmarks, angles: AngleReport, resolution: usize) -> anyhow::Result<()> {
        let image = match self.images.as_deref().and_then(|d| loader::find_image(d, name)) {
            Some(p) => Some(image::open(p)?),
            None => None,
        };
        let size = match &image {
            Some(img) => ImageSize::new(img.width(), img.height())?,
            None => ImageSize::square(resolution as u32)?,
        };
        let source = landmarks.rescale(size, resolution)?;

        if let Some(img) = &image {
            draw_landmarks(img, &source, &angles).save(self.out.join(format!("{name}.png")))?;
        }
        let analysis = Analysis::assemble(&source, angles, size);
        let w = BufWriter::new(File::create(self.out.join(format!("{name}.json")))?);
        serde_json::to_writer_pretty(w, &analysis)?;
        Ok(())
    }
}

/// 两组关键点之间的平均欧氏距离, 只统计两边都有限的关键点.
fn mean_distance(a: &ModelLandmarks, b: &ModelLandmarks) -> f64 {
    let (sum, n) = a
        .iter()
        .zip(b.iter())
        .map(|((_, (ax, ay)), (_, (bx, by)))| (ax - bx).hypot(ay - by))
        .filter(|d| d.is_finite())
        .fold((0.0, 0usize), |(s, n), d| (s + d, n + 1));
    match n {
        0 => f64::NAN,
        n => sum / n as f64,
    }
}

/// 在整个归档上运行解码器 `decode`.
fn sweep<F>(name: &str, archive: &NpzArchive, config: &ModelConfig, decode: F, reports: Option<&Reports>) -> Profile
where
    F: Fn(&ScoreMaps<f32>, Idx2d) -> ModelLandmarks,
{
    let mut profile = Profile::new();
    let shape = config.input_shape();
    for (index, entry) in archive.entry_names().into_iter().enumerate() {
        let maps = match archive.scores_by_index(index).map(ScoreMaps::<f32>::new) {
            Ok(Ok(maps)) => maps,
            Ok(Err(e)) => {
                log::warn!("{name}: 跳过 {entry}: {e}");
                profile.count_skipped();
                continue;
            }
            Err(e) => {
                log::warn!("{name}: 跳过 {entry}: {e}");
                profile.count_skipped();
                continue;
            }
        };
        log::debug!("{name}: {entry}...");

        profile.decode_start();
        let landmarks = decode(&maps, shape);
        let angles = compute_all_angles(&landmarks);
        profile.decode_elapsed();

        let drift = mean_distance(&landmarks, &maps.decode(shape));
        profile.count_entry(angles.cobb().angle(), landmarks.non_finite().len(), drift);

        if let Some(r) = reports {
            if let Err(e) = r.write(entry, &landmarks, angles, config.resolution() as usize) {
                log::warn!("{name}: 无法输出 {entry} 的报告: {e}");
            }
        }
    }
    profile.finish()
}

/// 串行 soft-argmax. 唯一输出报告的解码器.
pub fn soft(archive: &NpzArchive, config: &ModelConfig, reports: Option<&Reports>) -> Profile {
    sweep("soft", archive, config, |m, s| m.decode(s), reports)
}

/// 通道并行 soft-argmax.
pub fn soft_par(archive: &NpzArchive, config: &ModelConfig) -> Profile {
    sweep("soft-par", archive, config, |m, s| m.par_decode(s), None)
}

/// 硬 argmax.
pub fn hard(archive: &NpzArchive, config: &ModelConfig) -> Profile {
    sweep("hard", archive, config, |m, s| m.decode_hard(s), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_distance() {
        let a = ModelLandmarks::from_points(&[(0.0, 0.0); N_LANDMARKS]).unwrap();
        let mut pts = [(3.0, 4.0); N_LANDMARKS];
        pts[0] = (f64::NAN, 0.0);
        let b = ModelLandmarks::from_points(&pts).unwrap();
        assert_eq!(mean_distance(&a, &b), 5.0);
        assert_eq!(mean_distance(&a, &a), 0.0);
    }
}
