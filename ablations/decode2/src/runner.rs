//! 程序运行函数.

use crate::algos::{self, Reports};
use crate::result::AblationResult;
use anyhow::{ensure, Context};
use spine_berry::model::{Backbone, ModelConfig};
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> anyhow::Result<AblationResult> {
    let path = loader::score_archive_from_env_or_home().context("无法确定用户主目录")?;
    ensure!(path.is_file(), "得分图归档不存在: {}", path.display());

    let archive = loader::open_archive(&path)
        .with_context(|| format!("无法打开得分图归档 {}", path.display()))?;
    ensure!(archive.entry_len() > 0, "得分图归档为空: {}", path.display());
    log::info!(
        "{}: {} 个条目, {} 个读取通道",
        path.display(),
        archive.entry_len(),
        archive.worker_len()
    );

    let config = ModelConfig::with_backbone(Backbone::Archive {
        path: path.clone(),
        workers: utils::archive_workers(),
    });
    let reports = match loader::report_dir_from_env() {
        Some(dir) => {
            loader::ensure_dir(&dir).with_context(|| format!("无法创建报告目录 {}", dir.display()))?;
            Some(Reports::new(dir, loader::image_dir_from_env_or_home()))
        }
        None => None,
    };

    utils::sep();
    println!("Running ablation studies...");
    let (archive, config) = (&archive, &config);
    let profiles = thread::scope(|s| {
        let soft = s.spawn(move || algos::soft(archive, config, reports.as_ref()));
        let soft_par = s.spawn(move || algos::soft_par(archive, config));
        let hard = s.spawn(move || algos::hard(archive, config));
        [soft, soft_par, hard].map(|th| th.join().map_err(|_| anyhow::anyhow!("工作线程 panic")))
    });

    let mut data = Vec::with_capacity(profiles.len());
    for (name, profile) in ["soft", "soft-par", "hard"].into_iter().zip(profiles) {
        data.push((name, profile?));
    }
    Ok(AblationResult::from_iter(data))
}
