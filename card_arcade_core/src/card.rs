use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::GameError;

// --- 核心数据结构定义 ---

/// 花色 (Suit)
/// 花色之间没有大小之分，只用于同花判断和显示颜色
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Heart,   // 红心 ♥
    Diamond, // 方块 ♦
    Club,    // 梅花 ♣
    Spade,   // 黑桃 ♠
}

/// 牌面颜色
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CardColor {
    Red,
    Black,
}

impl Suit {
    /// 标准牌组的花色顺序
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    pub fn color(self) -> CardColor {
        match self {
            Suit::Heart | Suit::Diamond => CardColor::Red,
            Suit::Club | Suit::Spade => CardColor::Black,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Heart => "♥",
            Suit::Diamond => "♦",
            Suit::Club => "♣",
            Suit::Spade => "♠",
        }
    }
}

/// 点数 (Rank)
/// Ord 的派生让 Ace 默认是最大的；A-2-3-4-5 顺子由牌型评估单独处理
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    /// 点数值 2..=14，Ace 为 14
    pub fn value(self) -> u8 {
        self as u8 + 2
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }
}

/// 单张扑克牌 (Card)
///
/// `id` 只用于界面区分两个实体，相等性和哈希只看 (rank, suit)。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { id: Uuid::new_v4(), rank, suit }
    }

    pub fn color(&self) -> CardColor {
        self.suit.color()
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.suit == other.suit
    }
}

impl Eq for Card {}

impl Hash for Card {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
        self.suit.hash(state);
    }
}

/// 牌型类别 (HandCategory)
/// 变体的顺序从小到大排列，可以直接利用 `Ord` 进行比较。
/// 本应用只需要类别本身，不比较踢脚牌。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl HandCategory {
    /// 答题选项的展示顺序（从大到小）
    pub const ALL: [HandCategory; 10] = [
        HandCategory::RoyalFlush,
        HandCategory::StraightFlush,
        HandCategory::FourOfAKind,
        HandCategory::FullHouse,
        HandCategory::Flush,
        HandCategory::Straight,
        HandCategory::ThreeOfAKind,
        HandCategory::TwoPair,
        HandCategory::OnePair,
        HandCategory::HighCard,
    ];

    /// 牌力 1..=10
    pub fn strength(self) -> u8 {
        self as u8 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            HandCategory::RoyalFlush => "Royal Flush",
            HandCategory::StraightFlush => "Straight Flush",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::FullHouse => "Full House",
            HandCategory::Flush => "Flush",
            HandCategory::Straight => "Straight",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::OnePair => "One Pair",
            HandCategory::HighCard => "High Card",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HandCategory::RoyalFlush => "A, K, Q, J, 10 all of the same suit",
            HandCategory::StraightFlush => "Five cards in sequence, all of the same suit",
            HandCategory::FourOfAKind => "Four cards of the same rank",
            HandCategory::FullHouse => "Three of a kind plus a pair",
            HandCategory::Flush => "Five cards of the same suit, not in sequence",
            HandCategory::Straight => "Five cards in sequence, mixed suits",
            HandCategory::ThreeOfAKind => "Three cards of the same rank",
            HandCategory::TwoPair => "Two different pairs",
            HandCategory::OnePair => "Two cards of the same rank",
            HandCategory::HighCard => "No matching cards, highest card wins",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            HandCategory::RoyalFlush => "royal-flush",
            HandCategory::StraightFlush => "straight-flush",
            HandCategory::FourOfAKind => "four-of-a-kind",
            HandCategory::FullHouse => "full-house",
            HandCategory::Flush => "flush",
            HandCategory::Straight => "straight",
            HandCategory::ThreeOfAKind => "three-of-a-kind",
            HandCategory::TwoPair => "two-pair",
            HandCategory::OnePair => "one-pair",
            HandCategory::HighCard => "high-card",
        }
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Rank {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rank = match s.to_ascii_uppercase().as_str() {
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" | "T" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "A" => Rank::Ace,
            _ => return Err(GameError::ParseCard(s.to_string())),
        };
        Ok(rank)
    }
}

impl FromStr for Suit {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let suit = match s.trim_end_matches('\u{FE0F}') {
            "h" | "H" | "♥" => Suit::Heart,
            "d" | "D" | "♦" => Suit::Diamond,
            "c" | "C" | "♣" => Suit::Club,
            "s" | "S" | "♠" => Suit::Spade,
            _ => return Err(GameError::ParseCard(s.to_string())),
        };
        Ok(suit)
    }
}

/// 解析 "AH"、"10s"、"Q♦" 这样的写法，点数在前，花色在后
impl FromStr for Card {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // 花色总是最后一个字符（可能带 emoji 变体选择符）
        let split = s
            .char_indices()
            .rev()
            .find(|(_, c)| *c != '\u{FE0F}')
            .map(|(i, _)| i)
            .ok_or_else(|| GameError::ParseCard(s.to_string()))?;
        if split == 0 {
            return Err(GameError::ParseCard(s.to_string()));
        }
        let (rank, suit) = s.split_at(split);
        let rank = rank.parse::<Rank>().map_err(|_| GameError::ParseCard(s.to_string()))?;
        let suit = suit.parse::<Suit>().map_err(|_| GameError::ParseCard(s.to_string()))?;
        Ok(Card::new(rank, suit))
    }
}

impl FromStr for HandCategory {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        HandCategory::ALL
            .into_iter()
            .find(|category| category.slug() == wanted)
            .ok_or_else(|| GameError::ParseCategory(s.to_string()))
    }
}

// --- 牌型评估逻辑 ---

/// 评估一手 5 张牌的牌型类别
///
/// 纯函数，不涉及随机性。牌数不是 5 或者有重复的牌都属于调用方错误。
pub fn classify(hand: &[Card]) -> Result<HandCategory, GameError> {
    if hand.len() != 5 {
        return Err(GameError::InvalidHandSize { got: hand.len() });
    }
    for (i, card) in hand.iter().enumerate() {
        if hand[..i].contains(card) {
            return Err(GameError::DuplicateCard(*card));
        }
    }

    // 从小到大排序，方便处理
    let mut values: Vec<u8> = hand.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable();

    // 1. 检查同花
    let is_flush = hand.windows(2).all(|w| w[0].suit == w[1].suit);

    // 2. 检查顺子，A-2-3-4-5 是唯一允许的绕回情况
    let is_straight = values.windows(2).all(|w| w[1] == w[0] + 1) || values == [2, 3, 4, 5, 14];

    if is_straight && is_flush {
        return Ok(if values == [10, 11, 12, 13, 14] {
            HandCategory::RoyalFlush
        } else {
            HandCategory::StraightFlush
        });
    }

    // 3. 统计点数出现次数，用于判断四条、葫芦、三条、两对、一对
    let mut counts: HashMap<u8, u8> = HashMap::new();
    for value in &values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    let mut sorted_counts: Vec<u8> = counts.into_values().collect();
    sorted_counts.sort_unstable_by(|a, b| b.cmp(a));

    let category = match sorted_counts.as_slice() {
        [4, ..] => HandCategory::FourOfAKind,
        [3, 2] => HandCategory::FullHouse,
        _ if is_flush => HandCategory::Flush,
        _ if is_straight => HandCategory::Straight,
        [3, ..] => HandCategory::ThreeOfAKind,
        [2, 2, ..] => HandCategory::TwoPair,
        [2, ..] => HandCategory::OnePair,
        _ => HandCategory::HighCard,
    };
    Ok(category)
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use Rank::*;
    use Suit::*;

    // 辅助函数，用于快速创建牌
    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn all_cards() -> Vec<Card> {
        Suit::ALL
            .iter()
            .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| card(rank, suit)))
            .collect()
    }

    #[test]
    fn test_royal_flush() {
        let hand = [card(Ace, Heart), card(King, Heart), card(Queen, Heart), card(Jack, Heart), card(Ten, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::RoyalFlush);
    }

    #[test]
    fn test_straight_flush() {
        let hand = [card(Nine, Spade), card(Eight, Spade), card(Seven, Spade), card(Six, Spade), card(Five, Spade)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::StraightFlush);
    }

    #[test]
    fn test_ace_low_straight_flush() {
        let hand = [card(Ace, Club), card(Two, Club), card(Three, Club), card(Four, Club), card(Five, Club)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::StraightFlush);
    }

    #[test]
    fn test_four_of_a_kind() {
        let hand = [card(Ace, Heart), card(Ace, Diamond), card(Ace, Club), card(Ace, Spade), card(King, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::FourOfAKind);
    }

    #[test]
    fn test_full_house() {
        let hand = [card(King, Heart), card(King, Diamond), card(King, Club), card(Queen, Spade), card(Queen, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::FullHouse);
    }

    #[test]
    fn test_flush() {
        let hand = [card(Ace, Diamond), card(Jack, Diamond), card(Nine, Diamond), card(Seven, Diamond), card(Five, Diamond)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::Flush);
    }

    #[test]
    fn test_straight() {
        let hand = [card(Ten, Heart), card(Nine, Diamond), card(Eight, Club), card(Seven, Spade), card(Six, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::Straight);
    }

    #[test]
    fn test_ace_low_straight() {
        let hand = [card(Ace, Heart), card(Two, Diamond), card(Three, Club), card(Four, Spade), card(Five, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::Straight);
    }

    #[test]
    fn test_wrap_around_is_not_straight() {
        // K-A-2-3-4 不算顺子
        let hand = [card(King, Heart), card(Ace, Diamond), card(Two, Club), card(Three, Spade), card(Four, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::HighCard);
    }

    #[test]
    fn test_three_of_a_kind() {
        let hand = [card(Jack, Heart), card(Jack, Diamond), card(Jack, Club), card(Nine, Spade), card(Seven, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::ThreeOfAKind);
    }

    #[test]
    fn test_two_pair() {
        let hand = [card(King, Heart), card(King, Diamond), card(Eight, Club), card(Eight, Spade), card(Five, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::TwoPair);
    }

    #[test]
    fn test_one_pair() {
        let hand = [card(Queen, Heart), card(Queen, Diamond), card(Jack, Club), card(Nine, Spade), card(Seven, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::OnePair);
    }

    #[test]
    fn test_high_card() {
        let hand = [card(Ace, Heart), card(Jack, Diamond), card(Nine, Club), card(Seven, Spade), card(Five, Heart)];
        assert_eq!(classify(&hand).unwrap(), HandCategory::HighCard);
    }

    #[test]
    fn test_wrong_hand_size() {
        let hand = [card(Ace, Heart), card(Jack, Diamond), card(Nine, Club), card(Seven, Spade)];
        assert!(matches!(classify(&hand), Err(GameError::InvalidHandSize { got: 4 })));
        assert!(matches!(classify(&[]), Err(GameError::InvalidHandSize { got: 0 })));
    }

    #[test]
    fn test_duplicate_card_rejected() {
        let hand = [card(Ace, Heart), card(Ace, Heart), card(Nine, Club), card(Seven, Spade), card(Two, Club)];
        assert!(matches!(classify(&hand), Err(GameError::DuplicateCard(c)) if c == card(Ace, Heart)));
    }

    #[test]
    fn test_card_equality_ignores_id() {
        let a = card(Ten, Spade);
        let b = card(Ten, Spade);
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_rank_values_and_colors() {
        assert_eq!(Two.value(), 2);
        assert_eq!(Ten.value(), 10);
        assert_eq!(Ace.value(), 14);
        assert_eq!(Heart.color(), CardColor::Red);
        assert_eq!(Diamond.color(), CardColor::Red);
        assert_eq!(Club.color(), CardColor::Black);
        assert_eq!(Spade.color(), CardColor::Black);
    }

    #[test]
    fn test_category_strength_order() {
        assert_eq!(HandCategory::HighCard.strength(), 1);
        assert_eq!(HandCategory::RoyalFlush.strength(), 10);
        assert!(HandCategory::RoyalFlush > HandCategory::StraightFlush);
        assert!(HandCategory::FullHouse > HandCategory::Flush);
        assert!(HandCategory::Flush > HandCategory::Straight);
        assert!(HandCategory::Straight > HandCategory::ThreeOfAKind);
    }

    #[test]
    fn test_parse_card_and_category() {
        assert_eq!("AH".parse::<Card>().unwrap(), card(Ace, Heart));
        assert_eq!("10s".parse::<Card>().unwrap(), card(Ten, Spade));
        assert_eq!("Td".parse::<Card>().unwrap(), card(Ten, Diamond));
        assert_eq!("Q♦".parse::<Card>().unwrap(), card(Queen, Diamond));
        assert_eq!("K♣\u{FE0F}".parse::<Card>().unwrap(), card(King, Club));
        assert!("1H".parse::<Card>().is_err());
        assert!("H".parse::<Card>().is_err());
        assert!("".parse::<Card>().is_err());

        assert_eq!("two-pair".parse::<HandCategory>().unwrap(), HandCategory::TwoPair);
        assert_eq!("Royal Flush".parse::<HandCategory>().unwrap(), HandCategory::RoyalFlush);
        assert!("five-of-a-kind".parse::<HandCategory>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(card(Ace, Heart).to_string(), "A♥");
        assert_eq!(card(Ten, Club).to_string(), "10♣");
        assert_eq!(HandCategory::FourOfAKind.to_string(), "Four of a Kind");
    }

    // --- 性质测试 ---

    fn arb_hand() -> impl Strategy<Value = Vec<Card>> {
        proptest::sample::subsequence(all_cards(), 5).prop_shuffle()
    }

    fn relabel(suit: Suit, perm: &[Suit; 4]) -> Suit {
        let idx = Suit::ALL.iter().position(|s| *s == suit).unwrap();
        perm[idx]
    }

    proptest! {
        #[test]
        fn classify_accepts_every_distinct_hand(hand in arb_hand()) {
            prop_assert!(classify(&hand).is_ok());
        }

        #[test]
        fn classify_ignores_card_order(hand in arb_hand(), seed in any::<u64>()) {
            use rand::{SeedableRng, seq::SliceRandom};
            let mut shuffled = hand.clone();
            shuffled.shuffle(&mut rand::rngs::StdRng::seed_from_u64(seed));
            prop_assert_eq!(classify(&hand).unwrap(), classify(&shuffled).unwrap());
        }

        #[test]
        fn classify_ignores_suit_relabeling(
            hand in arb_hand(),
            perm in Just(Suit::ALL.to_vec()).prop_shuffle(),
        ) {
            let perm: [Suit; 4] = [perm[0], perm[1], perm[2], perm[3]];
            let relabeled: Vec<Card> = hand
                .iter()
                .map(|c| card(c.rank, relabel(c.suit, &perm)))
                .collect();
            prop_assert_eq!(classify(&hand).unwrap(), classify(&relabeled).unwrap());
        }
    }
}
