//! # 扑克小游戏核心逻辑库
//!
//! 这个 `core` crate 包含牌组模型、五张牌的牌型判定，
//! 以及两个小游戏（接牌 Deck-Catch、牌型训练 Poker-Trainer）的会话引擎，
//! 还有统计存储接口和客户端-服务器通信消息的定义。
//! 引擎不持有定时器，也不直接接触音效、震动或持久化，
//! 这些都由上层（服务器、客户端）注入或驱动。

mod card;
mod config;
mod context;
mod deck;
mod deck_catch;
mod error;
mod feedback;
mod message;
mod stats;
mod trainer;

pub use card::*;
pub use config::*;
pub use context::*;
pub use deck::*;
pub use deck_catch::*;
pub use error::*;
pub use feedback::*;
pub use message::*;
pub use stats::*;
pub use trainer::*;
