use std::sync::Arc;

use crate::feedback::{FeedbackEvent, FeedbackSink, NoFeedback};
use crate::stats::{MemoryStatsStore, StatsStore};

/// 注入给会话引擎的外部协作者
///
/// 取代全局单例：每个引擎在构造时拿到自己的一份（内部是共享的 Arc）。
#[derive(Clone)]
pub struct SessionContext {
    pub feedback: Arc<dyn FeedbackSink>,
    pub stats: Arc<dyn StatsStore>,
}

impl SessionContext {
    pub fn new(feedback: Arc<dyn FeedbackSink>, stats: Arc<dyn StatsStore>) -> Self {
        SessionContext { feedback, stats }
    }

    /// 不发反馈、统计只保存在内存中
    pub fn detached() -> Self {
        SessionContext {
            feedback: Arc::new(NoFeedback),
            stats: Arc::new(MemoryStatsStore::default()),
        }
    }

    pub(crate) fn emit(&self, event: FeedbackEvent) {
        self.feedback.emit(event);
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}
