//! 热图解码消融实验: soft-argmax (串行 / 并行) 与硬 argmax 的耗时与结果对比.
//!
//! 数据来源为 `$SPINE_SCORE_ARCHIVE` (默认 `$HOME/dataset/spine/scores.npz`).
//! 若设置了 `$SPINE_REPORT_DIR`, 则为每个条目输出一份 JSON 报告; 若 `$SPINE_IMAGE_DIR`
//! 下存在同名原图, 同时输出叠加图.

mod algos;
mod result;
mod runner;

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let result = runner::run()?;
    result.analyze()?;
    Ok(())
}
