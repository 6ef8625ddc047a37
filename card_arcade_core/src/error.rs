use thiserror::Error;

use crate::card::Card;

/// 核心逻辑的错误类型
///
/// 没有任何 I/O 错误：核心既不访问网络也不访问磁盘。
/// `InvalidTransition` 只表示调用被忽略，状态保持不变。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("手牌必须正好是 5 张 (实际 {got} 张)")]
    InvalidHandSize { got: usize },
    #[error("手牌中有重复的牌: {0}")]
    DuplicateCard(Card),
    #[error("牌不够发 (需要 {requested} 张, 剩余 {available} 张)")]
    InvalidDealSize { requested: usize, available: usize },
    #[error("当前阶段 {phase} 不允许 {action}")]
    InvalidTransition { action: &'static str, phase: &'static str },
    #[error("无法解析的牌: {0:?}")]
    ParseCard(String),
    #[error("无法解析的牌型: {0:?}")]
    ParseCategory(String),
}
