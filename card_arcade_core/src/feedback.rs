use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// 核心向外发出的反馈事件，由外部的音效/震动模块消费
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackEvent {
    /// 接住一张牌 / 答对
    Success,
    /// 漏掉一张牌 / 答错
    Error,
    /// 牌堆里最后一张牌已经落下
    Warning,
    /// 连续接住的第 n 张（n 为里程碑的倍数）
    ComboMilestone(u32),
    /// 连续答对的第 n 题
    StreakMilestone(u32),
    /// 打破了历史记录
    NewRecord,
}

/// 音效提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Success,
    Error,
    Warning,
    Combo,
    GameComplete,
}

/// 震动提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticCue {
    Success,
    Error,
    Warning,
    LightImpact,
    HeavyImpact,
}

impl FeedbackEvent {
    pub fn sound(self) -> SoundCue {
        match self {
            FeedbackEvent::Success => SoundCue::Success,
            FeedbackEvent::Error => SoundCue::Error,
            FeedbackEvent::Warning => SoundCue::Warning,
            FeedbackEvent::ComboMilestone(_) | FeedbackEvent::StreakMilestone(_) => SoundCue::Combo,
            FeedbackEvent::NewRecord => SoundCue::GameComplete,
        }
    }

    pub fn haptic(self) -> HapticCue {
        match self {
            FeedbackEvent::Success => HapticCue::Success,
            FeedbackEvent::Error => HapticCue::Error,
            FeedbackEvent::Warning => HapticCue::Warning,
            FeedbackEvent::ComboMilestone(_) | FeedbackEvent::StreakMilestone(_) => HapticCue::LightImpact,
            FeedbackEvent::NewRecord => HapticCue::HeavyImpact,
        }
    }
}

/// 反馈事件的接收方
///
/// 会话引擎在构造时注入，核心只负责发事件，从不直接调用平台的音频/震动接口。
pub trait FeedbackSink: Send + Sync {
    fn emit(&self, event: FeedbackEvent);
}

/// 丢弃所有事件
#[derive(Debug, Default)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {
    fn emit(&self, _event: FeedbackEvent) {}
}

/// 记录所有事件，便于测试或回放
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    events: Mutex<Vec<FeedbackEvent>>,
}

impl RecordingFeedback {
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: FeedbackEvent) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl FeedbackSink for RecordingFeedback {
    fn emit(&self, event: FeedbackEvent) {
        self.events.lock().push(event);
    }
}
