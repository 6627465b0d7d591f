//! 消融实验依赖的通用组件.

use std::num::NonZeroUsize;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 向 `w` 写入分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 归档读取通道数: 可并行核心数, 但不超过 64.
pub fn archive_workers() -> NonZeroUsize {
    NonZeroUsize::new(cpus().clamp(1, 64)).unwrap_or(NonZeroUsize::MIN)
}
