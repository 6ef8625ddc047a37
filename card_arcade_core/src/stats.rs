use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::trainer::TrainerMode;

// --- 会话结束时上报的数据 ---

/// 会话结束时读取的历史最佳成绩
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Records {
    /// 接牌最佳用时（秒），0 表示还没有记录
    pub deck_catch_best_time: f64,
    /// 接牌最佳准确率 0.0..=1.0
    pub deck_catch_best_accuracy: f64,
    pub trainer_best_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckCatchReport {
    pub elapsed_secs: f64,
    pub collected: u32,
    pub missed: u32,
    pub accuracy: f64,
    /// 是否接住了全部 52 张；只有这样用时才参与最佳用时的比较
    pub completed_deck: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerReport {
    pub mode: TrainerMode,
    /// 与历史最佳连对比较的成绩：无尽模式为连对数，十轮模式为答对数
    pub score: u32,
    pub streak: u32,
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatsUpdate {
    DeckCatch(DeckCatchReport),
    Trainer(TrainerReport),
}

/// 外部的持久化统计存储
///
/// 核心只在会话结束时调用：先 `records()` 读取历史最佳，再 `update_stats()` 写回。
pub trait StatsStore: Send + Sync {
    fn records(&self) -> Records;
    fn update_stats(&self, update: StatsUpdate);
}

// --- 持久化的完整档案 ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub has_onboarded: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { sound_enabled: true, vibration_enabled: true, has_onboarded: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub deck_catch_best_time: f64,
    pub deck_catch_best_accuracy: f64,
    pub deck_catch_sessions: u32,
    pub deck_catch_last_played: Option<DateTime<Utc>>,

    pub trainer_best_streak: u32,
    pub trainer_sessions: u32,
    pub trainer_last_played: Option<DateTime<Utc>>,
    pub trainer_correct_answers: u64,
    pub trainer_total_answers: u64,

    pub settings: Settings,
}

impl Profile {
    pub fn records(&self) -> Records {
        Records {
            deck_catch_best_time: self.deck_catch_best_time,
            deck_catch_best_accuracy: self.deck_catch_best_accuracy,
            trainer_best_streak: self.trainer_best_streak,
        }
    }

    /// 把一次会话的结果合并进档案
    pub fn apply(&mut self, update: &StatsUpdate, now: DateTime<Utc>) {
        match update {
            StatsUpdate::DeckCatch(report) => {
                // 用时越短越好，只有接完整副牌才算数
                if report.completed_deck
                    && (self.deck_catch_best_time == 0.0 || report.elapsed_secs < self.deck_catch_best_time)
                {
                    self.deck_catch_best_time = report.elapsed_secs;
                }
                if report.accuracy > self.deck_catch_best_accuracy {
                    self.deck_catch_best_accuracy = report.accuracy;
                }
                self.deck_catch_sessions += 1;
                self.deck_catch_last_played = Some(now);
            }
            StatsUpdate::Trainer(report) => {
                self.trainer_best_streak = self.trainer_best_streak.max(report.score);
                self.trainer_correct_answers += u64::from(report.correct);
                self.trainer_total_answers += u64::from(report.total);
                self.trainer_sessions += 1;
                self.trainer_last_played = Some(now);
            }
        }
    }

    /// 清空所有成绩，保留设置和引导页状态
    pub fn reset_progress(&mut self) {
        *self = Profile { settings: self.settings.clone(), ..Profile::default() };
    }

    /// 连引导页状态一起清空
    pub fn reset_everything(&mut self) {
        self.reset_progress();
        self.settings.has_onboarded = false;
    }

    pub fn total_sessions(&self) -> u32 {
        self.deck_catch_sessions + self.trainer_sessions
    }

    pub fn last_played(&self) -> Option<DateTime<Utc>> {
        self.deck_catch_last_played.max(self.trainer_last_played)
    }

    pub fn trainer_accuracy(&self) -> f64 {
        if self.trainer_total_answers == 0 {
            return 0.0;
        }
        self.trainer_correct_answers as f64 / self.trainer_total_answers as f64
    }

    pub fn formatted_last_played(&self) -> String {
        self.last_played()
            .map_or_else(|| "Never".to_string(), |date| date.format("%d.%m.%Y").to_string())
    }

    pub fn deck_catch_record_text(&self) -> String {
        if self.deck_catch_best_time > 0.0 {
            format!(
                "{} • {}",
                format_time(self.deck_catch_best_time),
                format_accuracy(self.deck_catch_best_accuracy)
            )
        } else {
            "No record yet".to_string()
        }
    }
}

/// "m:ss"
pub fn format_time(secs: f64) -> String {
    let whole = secs.max(0.0) as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// "87.5%"
pub fn format_accuracy(accuracy: f64) -> String {
    format!("{:.1}%", accuracy * 100.0)
}

/// 内存中的统计存储
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    profile: RwLock<Profile>,
}

impl MemoryStatsStore {
    pub fn new(profile: Profile) -> Self {
        MemoryStatsStore { profile: RwLock::new(profile) }
    }

    pub fn profile(&self) -> Profile {
        self.profile.read().clone()
    }

    pub fn update_profile<T>(&self, f: impl FnOnce(&mut Profile) -> T) -> T {
        f(&mut self.profile.write())
    }
}

impl StatsStore for MemoryStatsStore {
    fn records(&self) -> Records {
        self.profile.read().records()
    }

    fn update_stats(&self, update: StatsUpdate) {
        self.profile.write().apply(&update, Utc::now());
    }
}
