//! 预先导出的得分图归档.
//!
//! 外部模型对每张输入图像导出一个 `(102, H, W)` 的 `f32` 数组, 以 `{输入名}.npy` 为条目名存入同一个
//! `.npz` 文件. [`ArchiveModel`] 按输入名查表, 从而在不做推理的前提下复现模型输出.

use super::{check_surface, ModelConfig, ModelError, ModelInput, ScoreMapModel};
use crate::heatmap::ScoreMaps;
use ndarray::{Array3, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError};
use std::fmt::Formatter;
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 打开 `NpzArchive` 错误.
#[derive(Debug)]
pub enum OpenArchiveError {
    /// workers 太大. 最多支持 64.
    TooManyWorkers(usize),

    /// 打开 npz 文件错误.
    ReadNpzError(ReadNpzError),

    /// 其他底层 I/O 错误.
    IoError(std::io::Error),
}

impl std::fmt::Display for OpenArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenArchiveError::TooManyWorkers(n) => write!(f, "读取通道数 {n} 超过上限 64"),
            OpenArchiveError::ReadNpzError(e) => write!(f, "{e}"),
            OpenArchiveError::IoError(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for OpenArchiveError {}

/// Npz 得分图归档.
///
/// 同一个文件被打开 `workers` 次, 每个句柄由一把锁保护, 读取时轮流分派,
/// 因此多个线程可以同时读取不同条目.
pub struct NpzArchive {
    entries: Vec<Mutex<NpzReader<File>>>,
    names: Vec<String>,
    turn: AtomicUsize,
}

impl NpzArchive {
    /// 初始化.
    ///
    /// `workers` 指定了底层工作通道的个数, 最大为 64.
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> Result<Self, OpenArchiveError> {
        let workers = workers.get();
        if workers > 64 {
            return Err(OpenArchiveError::TooManyWorkers(workers));
        }
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            let file = OpenOptions::new()
                .read(true)
                .open(p.as_ref())
                .map_err(OpenArchiveError::IoError)?;
            v.push(Mutex::new(
                NpzReader::new(file).map_err(OpenArchiveError::ReadNpzError)?,
            ));
        }
        let names = v[0]
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .names()
            .map_err(OpenArchiveError::ReadNpzError)?;
        Ok(Self {
            entries: v,
            names,
            turn: AtomicUsize::new(0),
        })
    }

    /// 归档中的全部条目名 (去掉 `.npy` 后缀), 按归档顺序.
    pub fn entry_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .map(|n| n.strip_suffix(".npy").unwrap_or(n.as_str()))
            .collect()
    }

    /// 条目个数.
    #[inline]
    pub fn entry_len(&self) -> usize {
        self.names.len()
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    /// 读取名为 `name` (或 `{name}.npy`) 的得分图堆栈.
    pub fn scores_by_name(&self, name: &str) -> Result<Array3<f32>, ModelError> {
        let key = self
            .resolve(name)
            .ok_or_else(|| ModelError::MissingEntry(name.to_string()))?;
        self.next_reader()
            .by_name::<OwnedRepr<f32>, Ix3>(key)
            .map_err(|e| ModelError::Read(e.to_string()))
    }

    /// 按归档顺序读取第 `index` 个得分图堆栈.
    pub fn scores_by_index(&self, index: usize) -> Result<Array3<f32>, ModelError> {
        if index >= self.entry_len() {
            return Err(ModelError::MissingEntry(format!("#{index}")));
        }
        self.next_reader()
            .by_index::<OwnedRepr<f32>, Ix3>(index)
            .map_err(|e| ModelError::Read(e.to_string()))
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        let with_ext = format!("{name}.npy");
        self.names
            .iter()
            .find(|n| n.as_str() == name || **n == with_ext)
            .map(String::as_str)
    }

    fn next_reader(&self) -> MutexGuard<'_, NpzReader<File>> {
        let slot = self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len();
        self.entries[slot]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// 以 [`NpzArchive`] 为数据源的模型.
pub(crate) struct ArchiveModel {
    config: ModelConfig,
    archive: NpzArchive,
}

impl ArchiveModel {
    pub(crate) fn new(config: ModelConfig, archive: NpzArchive) -> Self {
        Self { config, archive }
    }
}

impl ScoreMapModel for ArchiveModel {
    fn produce_score_maps(&self, input: &ModelInput) -> Result<ScoreMaps<f32>, ModelError> {
        input.check(&self.config)?;
        let maps = ScoreMaps::<f32>::new(self.archive.scores_by_name(input.name())?)?;
        check_surface(&maps, &self.config)?;
        log::debug!("从归档读取得分图: {}", input.name());
        Ok(maps)
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeError;
    use crate::model::{load_model, Backbone};
    use ndarray::Array2;
    use ndarray_npy::NpzWriter;
    use std::sync::Arc;

    fn write_archive(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("scores.npz");
        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        let mut a = Array3::<f32>::zeros((102, 8, 8));
        a[(0, 2, 5)] = 100.0;
        npz.add_array("case01", &a).unwrap();
        npz.add_array("case02", &Array3::<f32>::zeros((102, 8, 8))).unwrap();
        npz.add_array("short", &Array3::<f32>::zeros((3, 8, 8))).unwrap();
        npz.add_array("coarse", &Array3::<f32>::zeros((102, 4, 4))).unwrap();
        npz.finish().unwrap();
        path
    }

    #[test]
    fn test_archive_read() {
        let dir = tempfile::tempdir().unwrap();
        let archive = NpzArchive::new(NonZeroUsize::new(3).unwrap(), write_archive(dir.path())).unwrap();
        assert_eq!(archive.worker_len(), 3);
        assert_eq!(archive.entry_len(), 4);
        assert_eq!(archive.entry_names(), ["case01", "case02", "short", "coarse"]);

        let a = archive.scores_by_name("case01").unwrap();
        assert_eq!(a[(0, 2, 5)], 100.0);
        assert_eq!(archive.scores_by_index(1).unwrap().dim(), (102, 8, 8));
        assert!(matches!(
            archive.scores_by_name("nope"),
            Err(ModelError::MissingEntry(_))
        ));
        assert!(matches!(
            archive.scores_by_index(9),
            Err(ModelError::MissingEntry(_))
        ));
    }

    #[test]
    fn test_too_many_workers() {
        let dir = tempfile::tempdir().unwrap();
        let e = NpzArchive::new(NonZeroUsize::new(65).unwrap(), write_archive(dir.path()));
        assert!(matches!(e, Err(OpenArchiveError::TooManyWorkers(65))));
    }

    #[test]
    fn test_archive_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::new(
            32,
            4,
            Backbone::Archive {
                path: write_archive(dir.path()),
                workers: NonZeroUsize::new(2).unwrap(),
            },
        )
        .unwrap();
        let model: Arc<dyn ScoreMapModel> = Arc::from(load_model(config).unwrap());
        let pixels = Array2::zeros((32, 32));

        let maps = model
            .produce_score_maps(&ModelInput::new("case01", pixels.clone()))
            .unwrap();
        let (x, y) = maps.decode_square(32).point(0).unwrap();
        assert!((x - 20.0).abs() < 1e-9 && (y - 8.0).abs() < 1e-9);

        let short = model.produce_score_maps(&ModelInput::new("short", pixels.clone()));
        assert_eq!(
            short.unwrap_err(),
            ModelError::Shape(ShapeError::ChannelCount {
                expected: 102,
                found: 3
            })
        );
        let coarse = model.produce_score_maps(&ModelInput::new("coarse", pixels));
        assert!(matches!(coarse, Err(ModelError::SurfaceShape { .. })));

        // 多线程并发读取.
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "case01" } else { "case02" };
                    model
                        .produce_score_maps(&ModelInput::new(name, Array2::zeros((32, 32))))
                        .map(|m| m.surface_shape())
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), Ok((8, 8)));
        }
    }
}
