use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::card::{Card, Rank, Suit};
use crate::error::GameError;

pub const DECK_SIZE: usize = 52;

/// 一副牌 (Deck)
///
/// 只是一个有序序列，本身不持有会话状态；每个会话引擎各自持有一份工作副本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Deck::standard()
    }
}

impl Deck {
    /// 按固定顺序创建 52 张牌：花色为主序 (♥ ♦ ♣ ♠)，点数 2..A 为次序
    pub fn standard() -> Deck {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for &suit in &Suit::ALL {
            for &rank in &Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Deck { cards }
    }

    /// 返回洗好的新牌组，原牌组不变
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Deck {
        let mut cards = self.cards.clone();
        fisher_yates(&mut cards, rng);
        Deck { cards }
    }

    /// 从这副牌的一个新洗牌副本中取出前 `n` 张
    pub fn deal<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<Card>, GameError> {
        if n > self.cards.len() {
            return Err(GameError::InvalidDealSize { requested: n, available: self.cards.len() });
        }
        let mut cards = self.shuffled(rng).cards;
        cards.truncate(n);
        Ok(cards)
    }

    /// 是否正好包含 52 种不同的 (rank, suit) 组合
    pub fn is_complete(&self) -> bool {
        if self.cards.len() != DECK_SIZE {
            return false;
        }
        let unique: std::collections::HashSet<&Card> = self.cards.iter().collect();
        unique.len() == DECK_SIZE
    }

    /// 恢复为标准顺序的 52 张牌
    pub fn reset(&mut self) {
        *self = Deck::standard();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }
}

/// Fisher-Yates 洗牌：从最后一个位置往前，每个位置与 [0, i] 中均匀随机的位置交换
fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
