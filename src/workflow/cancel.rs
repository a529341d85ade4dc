use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 一次性取消信号
///
/// 展示层只能置位，运行任务在分组和子单元边界上主动检查，不会打断正在进行的填写或提交。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
