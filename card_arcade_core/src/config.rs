use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 两个小游戏的可调参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub deck_catch: DeckCatchConfig,
    pub trainer: TrainerConfig,
}

/// 接牌游戏的参数。坐标系原点在左上角，y 向下增长。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckCatchConfig {
    /// 计时的粗粒度 tick
    pub clock_interval_ms: u64,
    /// 出牌间隔
    pub spawn_interval_ms: u64,
    /// 位置/视差刷新的细粒度 tick (约 60Hz)
    pub frame_interval_ms: u64,
    /// 基础下落速度，单位/秒
    pub base_velocity: f32,
    pub field_width: f32,
    pub spawn_margin: f32,
    pub spawn_y: f32,
    /// 越过这条线的牌算漏接
    pub miss_line: f32,
    /// 背景视差滚动速度，单位/秒
    pub parallax_speed: f32,
    pub combo_milestone: u32,
}

impl Default for DeckCatchConfig {
    fn default() -> Self {
        DeckCatchConfig {
            clock_interval_ms: 100,
            spawn_interval_ms: 1500,
            frame_interval_ms: 16,
            base_velocity: 120.0,
            field_width: 390.0,
            spawn_margin: 50.0,
            spawn_y: -100.0,
            miss_line: 744.0,
            parallax_speed: 30.0,
            combo_milestone: 5,
        }
    }
}

impl DeckCatchConfig {
    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub streak_milestone: u32,
    /// 最后一轮结果展示多久之后结束会话
    pub result_delay_ms: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig { streak_milestone: 5, result_delay_ms: 2000 }
    }
}

impl TrainerConfig {
    pub fn result_delay(&self) -> Duration {
        Duration::from_millis(self.result_delay_ms)
    }
}
