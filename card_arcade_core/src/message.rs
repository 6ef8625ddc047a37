use crate::card::{Card, HandCategory};
use crate::deck_catch::DeckCatchSnapshot;
use crate::feedback::{FeedbackEvent, HapticCue, SoundCue};
use crate::stats::Profile;
use crate::trainer::{TrainerMode, TrainerSnapshot};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClientMessage {
    // --- 接牌 ---
    /// 开始（或在结束后重新开始）一局接牌
    StartDeckCatch,
    PauseDeckCatch,
    ResumeDeckCatch,
    RestartDeckCatch,
    /// 退出接牌，停止所有定时器
    ExitDeckCatch,
    /// 点击一张正在下落的牌
    CatchCard(Card),

    // --- 牌型训练 ---
    StartTrainer(TrainerMode),
    Answer(HandCategory),
    NextRound,
    RestartTrainer,

    // --- 档案与设置 ---
    GetProfile,
    SetSoundEnabled(bool),
    SetVibrationEnabled(bool),
    CompleteOnboarding,
    /// 清空所有成绩，保留设置
    ResetProgress,
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// 接牌游戏的最新快照
    DeckCatch(DeckCatchSnapshot),
    /// 牌型训练的最新快照。未作答时不含正确答案。
    Trainer(TrainerSnapshot),
    /// 按设置过滤后的反馈提示；被关闭的一项为 None
    Feedback {
        event: FeedbackEvent,
        sound: Option<SoundCue>,
        haptic: Option<HapticCue>,
    },
    Profile(Profile),

    Info { message: String },
    Error { message: String },
}

impl From<DeckCatchSnapshot> for ServerMessage {
    fn from(snapshot: DeckCatchSnapshot) -> Self {
        ServerMessage::DeckCatch(snapshot)
    }
}

impl From<TrainerSnapshot> for ServerMessage {
    fn from(snapshot: TrainerSnapshot) -> Self {
        ServerMessage::Trainer(snapshot)
    }
}

impl From<HandCategory> for ClientMessage {
    fn from(category: HandCategory) -> Self {
        ClientMessage::Answer(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    #[test]
    fn client_message_wire_format() {
        let msg = ClientMessage::StartTrainer(TrainerMode::FixedRounds(10));
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"StartTrainer":{"FixedRounds":10}}"#);

        let json = serde_json::to_string(&ClientMessage::StartDeckCatch).unwrap();
        assert_eq!(json, r#""StartDeckCatch""#);
    }

    #[test]
    fn catch_card_ignores_identity_token() {
        let card = Card::new(Rank::Ace, Suit::Heart);
        let json = serde_json::to_string(&ClientMessage::CatchCard(card)).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClientMessage::CatchCard(Card::new(Rank::Ace, Suit::Heart)));

        // 客户端可以不带 id
        let back: ClientMessage =
            serde_json::from_str(r#"{"CatchCard":{"rank":"Ace","suit":"Heart"}}"#).unwrap();
        assert_eq!(back, ClientMessage::CatchCard(card));
    }

    #[test]
    fn from_impls() {
        assert_eq!(
            ClientMessage::from(HandCategory::TwoPair),
            ClientMessage::Answer(HandCategory::TwoPair)
        );
    }
}
