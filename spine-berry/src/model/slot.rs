//! 模型只加载一次.

use super::{load_model, ModelConfig, ModelError, ScoreMapModel};
use once_cell::sync::OnceCell;

/// 进程内的模型槽位. 第一次成功加载后即固定, 此后所有调用共享同一个模型.
///
/// 加载失败不会占用槽位, 下一次调用会重新尝试.
#[derive(Default)]
pub struct ModelSlot {
    cell: OnceCell<Box<dyn ScoreMapModel>>,
}

impl ModelSlot {
    /// 空槽位.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 获取模型; 尚未加载时按 `config` 加载.
    ///
    /// 多个线程同时调用时, 只有一个线程执行加载, 其余线程等待其结果.
    pub fn get_or_load(&self, config: &ModelConfig) -> Result<&dyn ScoreMapModel, ModelError> {
        self.cell
            .get_or_try_init(|| load_model(config.clone()))
            .map(|m| m.as_ref())
    }

    /// 已加载的模型.
    #[inline]
    pub fn get(&self) -> Option<&dyn ScoreMapModel> {
        self.cell.get().map(|m| m.as_ref())
    }

    /// 是否已加载?
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
