use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::card::{Card, HandCategory, classify};
use crate::config::TrainerConfig;
use crate::context::SessionContext;
use crate::deck::Deck;
use crate::error::GameError;
use crate::feedback::FeedbackEvent;
use crate::stats::{StatsUpdate, TrainerReport};

/// 训练模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerMode {
    /// 一直答到第一次答错
    Endless,
    /// 固定轮数，答错只清零连对
    FixedRounds(u32),
}

impl TrainerMode {
    pub fn ten_rounds() -> Self {
        TrainerMode::FixedRounds(10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerPhase {
    Playing,
    GameOver,
}

impl TrainerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TrainerPhase::Playing => "Playing",
            TrainerPhase::GameOver => "GameOver",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub category: HandCategory,
}

/// 对外暴露的只读快照。正确答案只在结果展示时或会话结束后给出。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerSnapshot {
    pub mode: TrainerMode,
    pub phase: TrainerPhase,
    pub hand: Vec<Card>,
    pub selected: Option<HandCategory>,
    pub showing_result: bool,
    pub last_answer_correct: bool,
    pub correct_category: Option<HandCategory>,
    pub streak: u32,
    pub round: u32,
    pub correct: u32,
    pub total: u32,
    pub finish_pending: bool,
    pub new_record: bool,
}

/// 牌型训练的会话引擎
///
/// 每一轮都从一副新洗的牌中发 5 张，不共用逐渐变少的牌堆。
#[derive(Debug)]
pub struct Trainer {
    config: TrainerConfig,
    ctx: SessionContext,
    rng: StdRng,
    mode: TrainerMode,
    phase: TrainerPhase,
    hand: Vec<Card>,
    correct_category: HandCategory,
    selected: Option<HandCategory>,
    showing_result: bool,
    last_answer_correct: bool,
    streak: u32,
    round: u32,
    correct: u32,
    total: u32,
    // 最后一轮已答完，等结果展示后结束
    finish_pending: bool,
    new_record: bool,
}

impl Trainer {
    /// 创建引擎并立即开始一个会话
    pub fn start(config: TrainerConfig, ctx: SessionContext, mode: TrainerMode) -> Result<Self, GameError> {
        Self::start_with_rng(config, ctx, mode, StdRng::from_os_rng())
    }

    pub fn start_with_rng(
        config: TrainerConfig,
        ctx: SessionContext,
        mode: TrainerMode,
        rng: StdRng,
    ) -> Result<Self, GameError> {
        let mut trainer = Trainer {
            config,
            ctx,
            rng,
            mode,
            phase: TrainerPhase::Playing,
            hand: Vec::new(),
            correct_category: HandCategory::HighCard,
            selected: None,
            showing_result: false,
            last_answer_correct: false,
            streak: 0,
            round: 0,
            correct: 0,
            total: 0,
            finish_pending: false,
            new_record: false,
        };
        trainer.start_session(mode)?;
        Ok(trainer)
    }

    /// 清零所有计数并发第一轮，任何阶段都可以调用
    pub fn start_session(&mut self, mode: TrainerMode) -> Result<(), GameError> {
        self.mode = mode;
        self.streak = 0;
        self.round = 0;
        self.correct = 0;
        self.total = 0;
        self.finish_pending = false;
        self.new_record = false;
        self.last_answer_correct = false;
        self.phase = TrainerPhase::Playing;
        info!("牌型训练: 新会话 {:?}", mode);
        self.deal_round()
    }

    /// 以相同模式重新开始
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.start_session(self.mode)
    }

    fn invalid(&self, action: &'static str) -> GameError {
        debug!("牌型训练: 忽略 {}，当前阶段 {}", action, self.phase.as_str());
        GameError::InvalidTransition { action, phase: self.phase.as_str() }
    }

    /// 从新洗的牌中发 5 张并评估正确牌型
    fn deal_round(&mut self) -> Result<(), GameError> {
        if self.phase != TrainerPhase::Playing {
            return Err(self.invalid("deal"));
        }
        let hand = Deck::standard().deal(5, &mut self.rng)?;
        self.correct_category = classify(&hand)?;
        self.hand = hand;
        self.selected = None;
        self.showing_result = false;

        if let TrainerMode::FixedRounds(_) = self.mode {
            self.round += 1;
        }
        debug!("牌型训练: 第 {} 轮，牌型 {}", self.round, self.correct_category);
        Ok(())
    }

    /// 提交答案。同一轮的结果还在展示时，再次提交不产生任何效果。
    pub fn answer(&mut self, candidate: HandCategory) -> Result<AnswerOutcome, GameError> {
        if self.phase != TrainerPhase::Playing || self.showing_result {
            return Err(self.invalid("answer"));
        }
        let is_correct = candidate == self.correct_category;
        self.selected = Some(candidate);
        self.last_answer_correct = is_correct;
        self.total += 1;
        self.showing_result = true;

        let outcome = AnswerOutcome { correct: is_correct, category: self.correct_category };

        if is_correct {
            self.correct += 1;
            self.streak += 1;
            self.ctx.emit(FeedbackEvent::Success);
            let milestone = self.config.streak_milestone;
            if milestone > 0 && self.streak % milestone == 0 {
                self.ctx.emit(FeedbackEvent::StreakMilestone(self.streak));
            }
        } else {
            self.ctx.emit(FeedbackEvent::Error);
            match self.mode {
                TrainerMode::Endless => {
                    self.end();
                    return Ok(outcome);
                }
                TrainerMode::FixedRounds(_) => self.streak = 0,
            }
        }

        if let TrainerMode::FixedRounds(rounds) = self.mode {
            if self.round >= rounds {
                self.finish_pending = true;
            }
        }
        Ok(outcome)
    }

    /// 进入下一轮。最后一轮答完之后调用则直接结束会话。
    pub fn next_round(&mut self) -> Result<(), GameError> {
        if self.phase != TrainerPhase::Playing || !self.showing_result {
            return Err(self.invalid("next_round"));
        }
        if self.finish_pending {
            self.end();
            return Ok(());
        }
        self.deal_round()
    }

    /// 最后一轮结果展示完毕后由调度方调用
    pub fn finish_pending_session(&mut self) -> Result<(), GameError> {
        if self.phase != TrainerPhase::Playing || !self.finish_pending {
            return Err(self.invalid("finish"));
        }
        self.end();
        Ok(())
    }

    fn end(&mut self) {
        if self.phase == TrainerPhase::GameOver {
            return;
        }
        self.phase = TrainerPhase::GameOver;
        self.finish_pending = false;

        let records = self.ctx.stats.records();
        let score = match self.mode {
            TrainerMode::Endless => self.streak,
            TrainerMode::FixedRounds(_) => self.correct,
        };
        self.new_record = score > records.trainer_best_streak;
        info!(
            "牌型训练: 会话结束，成绩 {} 答对 {}/{} 新纪录 {}",
            score, self.correct, self.total, self.new_record
        );
        if self.new_record {
            self.ctx.emit(FeedbackEvent::NewRecord);
        }

        self.ctx.stats.update_stats(StatsUpdate::Trainer(TrainerReport {
            mode: self.mode,
            score,
            streak: self.streak,
            correct: self.correct,
            total: self.total,
        }));
    }

    // --- 查询 ---

    pub fn mode(&self) -> TrainerMode {
        self.mode
    }

    pub fn phase(&self) -> TrainerPhase {
        self.phase
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn correct_category(&self) -> HandCategory {
        self.correct_category
    }

    pub fn is_showing_result(&self) -> bool {
        self.showing_result
    }

    pub fn is_finish_pending(&self) -> bool {
        self.finish_pending
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> TrainerSnapshot {
        let revealed = self.showing_result || self.phase == TrainerPhase::GameOver;
        TrainerSnapshot {
            mode: self.mode,
            phase: self.phase,
            hand: self.hand.clone(),
            selected: self.selected,
            showing_result: self.showing_result,
            last_answer_correct: self.last_answer_correct,
            correct_category: revealed.then_some(self.correct_category),
            streak: self.streak,
            round: self.round,
            correct: self.correct,
            total: self.total,
            finish_pending: self.finish_pending,
            new_record: self.new_record,
        }
    }
}
