//! 对 `spine-berry::dataset` 的更一层封装. 提供更直接的数据集定位与加载.

use spine_berry::dataset::env_or_home;
use spine_berry::model::{NpzArchive, OpenArchiveError};
use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// 获取得分图归档路径.
///
/// 1. 若环境变量 `$SPINE_SCORE_ARCHIVE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/spine/scores.npz`.
pub fn score_archive_from_env_or_home() -> Option<PathBuf> {
    env_or_home("SPINE_SCORE_ARCHIVE", ["spine", "scores.npz"])
}

/// 获取原始 X 光片目录.
///
/// 1. 若环境变量 `$SPINE_IMAGE_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/spine/images`.
pub fn image_dir_from_env_or_home() -> Option<PathBuf> {
    env_or_home("SPINE_IMAGE_DIR", ["spine", "images"])
}

/// 获取报告输出目录. 只有设置了 `$SPINE_REPORT_DIR` 才输出报告.
pub fn report_dir_from_env() -> Option<PathBuf> {
    env::var_os("SPINE_REPORT_DIR")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
}

/// 打开得分图归档.
#[inline]
pub fn open_archive<P: AsRef<Path>>(path: P) -> Result<NpzArchive, OpenArchiveError> {
    NpzArchive::new(crate::archive_workers(), path)
}

/// 查找 `dir` 下名为 `{name}.png` / `{name}.jpg` / `{name}.jpeg` 的原图.
pub fn find_image(dir: &Path, name: &str) -> Option<PathBuf> {
    ["png", "jpg", "jpeg"]
        .into_iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}

/// 确保报告目录存在.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}
