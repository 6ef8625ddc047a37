use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::card::Card;
use crate::config::DeckCatchConfig;
use crate::context::SessionContext;
use crate::deck::{DECK_SIZE, Deck};
use crate::error::GameError;
use crate::feedback::FeedbackEvent;
use crate::stats::{DeckCatchReport, StatsUpdate, format_accuracy, format_time};

/// 接牌游戏的阶段
///
/// Setup -> Playing <-> Paused -> GameOver，GameOver 可以通过 start/restart 重新开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckCatchPhase {
    Setup,
    Playing,
    Paused,
    GameOver,
}

impl DeckCatchPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DeckCatchPhase::Setup => "Setup",
            DeckCatchPhase::Playing => "Playing",
            DeckCatchPhase::Paused => "Paused",
            DeckCatchPhase::GameOver => "GameOver",
        }
    }
}

/// 正在下落的牌。生成时创建，被接住或漏掉时销毁。
/// 旋转和缩放只用于展示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingCard {
    pub id: Uuid,
    pub card: Card,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale: f32,
    /// 单位/秒
    pub velocity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchOutcome {
    Collected,
    /// 没有匹配的下落牌（点晚了或者重复点击）
    NotFalling,
}

/// 每次状态变化后对外暴露的只读快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckCatchSnapshot {
    pub phase: DeckCatchPhase,
    pub falling: Vec<FallingCard>,
    pub collected: u32,
    pub missed: u32,
    pub combo: u32,
    pub remaining: usize,
    pub elapsed_secs: f64,
    pub formatted_time: String,
    pub accuracy: f64,
    pub formatted_accuracy: String,
    pub background_offset: f32,
    pub new_record: bool,
}

/// 接牌游戏的会话引擎
///
/// 引擎本身不持有任何定时器，由外部按三个频率驱动：
/// - `clock_tick`：累计游戏时间
/// - `spawn`：出牌
/// - `tick`：推进位置并结算漏接
///
/// 非 Playing 阶段的 tick 一律忽略，所以暂停期间或结束之后迟到的 tick 不会改动任何数据。
#[derive(Debug)]
pub struct DeckCatch {
    config: DeckCatchConfig,
    ctx: SessionContext,
    rng: StdRng,
    phase: DeckCatchPhase,
    draw_pile: VecDeque<Card>,
    falling: Vec<FallingCard>,
    collected: u32,
    missed: u32,
    combo: u32,
    elapsed: Duration,
    background_offset: f32,
    new_record: bool,
}

impl DeckCatch {
    pub fn new(config: DeckCatchConfig, ctx: SessionContext) -> Self {
        Self::with_rng(config, ctx, StdRng::from_os_rng())
    }

    pub fn with_rng(config: DeckCatchConfig, ctx: SessionContext, rng: StdRng) -> Self {
        let mut engine = DeckCatch {
            config,
            ctx,
            rng,
            phase: DeckCatchPhase::Setup,
            draw_pile: VecDeque::new(),
            falling: Vec::new(),
            collected: 0,
            missed: 0,
            combo: 0,
            elapsed: Duration::ZERO,
            background_offset: 0.0,
            new_record: false,
        };
        engine.setup();
        engine
    }

    /// 重新洗牌作为抽牌堆，清空计数
    fn setup(&mut self) {
        self.draw_pile = Deck::standard().shuffled(&mut self.rng).into_cards().into();
        self.falling.clear();
        self.collected = 0;
        self.missed = 0;
        self.combo = 0;
        self.elapsed = Duration::ZERO;
        self.background_offset = 0.0;
        self.new_record = false;
        self.phase = DeckCatchPhase::Setup;
    }

    fn invalid(&self, action: &'static str) -> GameError {
        debug!("接牌: 忽略 {}，当前阶段 {}", action, self.phase.as_str());
        GameError::InvalidTransition { action, phase: self.phase.as_str() }
    }

    // --- 玩家操作 ---

    /// 开始游戏，只能从 Setup 或 GameOver 进入。第一张牌立即落下。
    pub fn start(&mut self) -> Result<(), GameError> {
        match self.phase {
            DeckCatchPhase::Setup => {}
            DeckCatchPhase::GameOver => self.setup(),
            DeckCatchPhase::Playing | DeckCatchPhase::Paused => return Err(self.invalid("start")),
        }
        self.phase = DeckCatchPhase::Playing;
        info!("接牌: 游戏开始，牌堆 {} 张", self.draw_pile.len());
        self.spawn();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        if self.phase != DeckCatchPhase::Playing {
            return Err(self.invalid("pause"));
        }
        self.phase = DeckCatchPhase::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        if self.phase != DeckCatchPhase::Paused {
            return Err(self.invalid("resume"));
        }
        self.phase = DeckCatchPhase::Playing;
        Ok(())
    }

    /// 任何阶段都可以重新开始，本局成绩不上报
    pub fn restart(&mut self) {
        self.setup();
        self.phase = DeckCatchPhase::Playing;
        info!("接牌: 重新开始");
        self.spawn();
    }

    /// 接住一张正在下落的牌，按 (rank, suit) 匹配
    pub fn catch(&mut self, card: &Card) -> Result<CatchOutcome, GameError> {
        if self.phase != DeckCatchPhase::Playing {
            return Err(self.invalid("catch"));
        }
        let Some(index) = self.falling.iter().position(|f| f.card == *card) else {
            debug!("接牌: {} 不在下落中", card);
            return Ok(CatchOutcome::NotFalling);
        };
        self.falling.remove(index);
        self.collected += 1;
        self.combo += 1;

        self.ctx.emit(FeedbackEvent::Success);
        if self.config.combo_milestone > 0 && self.combo % self.config.combo_milestone == 0 {
            self.ctx.emit(FeedbackEvent::ComboMilestone(self.combo));
        }

        if self.collected as usize == DECK_SIZE || self.is_exhausted() {
            self.end();
        }
        Ok(CatchOutcome::Collected)
    }

    // --- 外部驱动的 tick ---

    /// 粗粒度计时 tick
    pub fn clock_tick(&mut self, dt: Duration) {
        if self.phase != DeckCatchPhase::Playing {
            return;
        }
        self.elapsed += dt;
    }

    /// 出牌 tick。牌堆为空且没有下落中的牌时结束会话。
    pub fn spawn(&mut self) {
        if self.phase != DeckCatchPhase::Playing {
            return;
        }
        let Some(card) = self.draw_pile.pop_front() else {
            if self.falling.is_empty() {
                self.end();
            }
            return;
        };

        // 牌堆越少下落越快，最后一张达到 1.5 倍
        let consumed = (DECK_SIZE - self.draw_pile.len()) as f32 / DECK_SIZE as f32;
        let velocity = self.config.base_velocity * (1.0 + 0.5 * consumed);

        let min_x = self.config.spawn_margin;
        let max_x = (self.config.field_width - self.config.spawn_margin).max(min_x);
        let falling = FallingCard {
            id: Uuid::new_v4(),
            card,
            x: self.rng.random_range(min_x..=max_x),
            y: self.config.spawn_y,
            rotation: self.rng.random_range(-15.0..=15.0),
            scale: self.rng.random_range(0.8..=1.0),
            velocity,
        };
        debug!("接牌: 落下 {}，速度 {:.1}", card, velocity);
        self.falling.push(falling);

        if self.draw_pile.is_empty() {
            self.ctx.emit(FeedbackEvent::Warning);
        }
    }

    /// 细粒度 tick：先推进所有位置，再结算本 tick 内越线的所有牌
    pub fn tick(&mut self, dt: Duration) {
        if self.phase != DeckCatchPhase::Playing {
            return;
        }
        let secs = dt.as_secs_f32();
        for falling in &mut self.falling {
            falling.y += falling.velocity * secs;
        }
        self.background_offset += self.config.parallax_speed * secs;

        let miss_line = self.config.miss_line;
        let (crossed, live): (Vec<FallingCard>, Vec<FallingCard>) =
            self.falling.drain(..).partition(|f| f.y > miss_line);
        self.falling = live;

        for falling in crossed {
            debug!("接牌: 漏掉 {}", falling.card);
            self.missed += 1;
            self.combo = 0;
            self.ctx.emit(FeedbackEvent::Error);
        }

        if self.is_exhausted() {
            self.end();
        }
    }

    fn is_exhausted(&self) -> bool {
        self.draw_pile.is_empty() && self.falling.is_empty()
    }

    /// 结束会话：与历史最佳比较并上报成绩
    fn end(&mut self) {
        if self.phase == DeckCatchPhase::GameOver {
            return;
        }
        self.phase = DeckCatchPhase::GameOver;

        let records = self.ctx.stats.records();
        let elapsed_secs = self.elapsed.as_secs_f64();
        let accuracy = self.accuracy();
        let completed_deck = self.collected as usize == DECK_SIZE;

        let faster = completed_deck
            && (records.deck_catch_best_time == 0.0 || elapsed_secs < records.deck_catch_best_time);
        let more_accurate = accuracy > records.deck_catch_best_accuracy;
        self.new_record = faster || more_accurate;

        info!(
            "接牌: 游戏结束，接住 {} 漏掉 {} 用时 {} 准确率 {} 新纪录 {}",
            self.collected,
            self.missed,
            format_time(elapsed_secs),
            format_accuracy(accuracy),
            self.new_record
        );
        if self.new_record {
            self.ctx.emit(FeedbackEvent::NewRecord);
        }

        self.ctx.stats.update_stats(StatsUpdate::DeckCatch(DeckCatchReport {
            elapsed_secs,
            collected: self.collected,
            missed: self.missed,
            accuracy,
            completed_deck,
        }));
    }

    // --- 查询 ---

    pub fn phase(&self) -> DeckCatchPhase {
        self.phase
    }

    pub fn config(&self) -> &DeckCatchConfig {
        &self.config
    }

    pub fn falling(&self) -> &[FallingCard] {
        &self.falling
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn remaining(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.collected + self.missed;
        if total == 0 {
            return 0.0;
        }
        self.collected as f64 / total as f64
    }

    pub fn snapshot(&self) -> DeckCatchSnapshot {
        let elapsed_secs = self.elapsed.as_secs_f64();
        let accuracy = self.accuracy();
        DeckCatchSnapshot {
            phase: self.phase,
            falling: self.falling.clone(),
            collected: self.collected,
            missed: self.missed,
            combo: self.combo,
            remaining: self.draw_pile.len(),
            elapsed_secs,
            formatted_time: format_time(elapsed_secs),
            accuracy,
            formatted_accuracy: format_accuracy(accuracy),
            background_offset: self.background_offset,
            new_record: self.new_record,
        }
    }
}
