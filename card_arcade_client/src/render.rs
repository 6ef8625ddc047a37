use card_arcade_core::{
    Card, DeckCatchPhase, DeckCatchSnapshot, Profile, ServerMessage, TrainerMode, TrainerPhase, TrainerSnapshot,
    format_accuracy,
};

fn hand_text(cards: impl IntoIterator<Item = Card>) -> String {
    cards.into_iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

/// 接牌快照的摘要。每帧都会收到快照，只有摘要变化时才打印。
pub fn deck_catch_summary(s: &DeckCatchSnapshot) -> String {
    match s.phase {
        DeckCatchPhase::GameOver => format!(
            "[接牌] 结束 用时 {} 接住 {} 漏掉 {} 准确率 {}{}",
            s.formatted_time,
            s.collected,
            s.missed,
            s.formatted_accuracy,
            if s.new_record { " 新纪录!" } else { "" }
        ),
        phase => format!(
            "[接牌] {:?} 剩余 {} 接住 {} 漏掉 {} 连击 {} 下落中: {}",
            phase,
            s.remaining,
            s.collected,
            s.missed,
            s.combo,
            hand_text(s.falling.iter().map(|f| f.card))
        ),
    }
}

pub fn trainer_summary(s: &TrainerSnapshot) -> String {
    let progress = match s.mode {
        TrainerMode::Endless => format!("连对 {}", s.streak),
        TrainerMode::FixedRounds(rounds) => format!("第 {}/{} 轮 答对 {} 连对 {}", s.round, rounds, s.correct, s.streak),
    };
    let mut line = format!("[训练] {} 手牌: {}", progress, hand_text(s.hand.iter().copied()));
    if let Some(category) = s.correct_category {
        let verdict = if s.last_answer_correct { "正确" } else { "错误" };
        line.push_str(&format!(" | {} 答案: {} ({})", verdict, category, category.description()));
    }
    if s.phase == TrainerPhase::GameOver {
        line.push_str(&format!(" | 结束 {}/{}", s.correct, s.total));
        if s.new_record {
            line.push_str(" 新纪录!");
        }
    }
    line
}

pub fn profile_summary(p: &Profile) -> String {
    format!(
        "[档案] 接牌 {} 局 最佳: {} | 训练 {} 局 最佳连对 {} 准确率 {} | 最近游玩 {} | 音效 {} 震动 {}",
        p.deck_catch_sessions,
        p.deck_catch_record_text(),
        p.trainer_sessions,
        p.trainer_best_streak,
        format_accuracy(p.trainer_accuracy()),
        p.formatted_last_played(),
        p.settings.sound_enabled,
        p.settings.vibration_enabled,
    )
}

pub fn summary(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::DeckCatch(s) => deck_catch_summary(s),
        ServerMessage::Trainer(s) => trainer_summary(s),
        ServerMessage::Feedback { event, sound, haptic } => {
            format!("[反馈] {:?} 音效 {:?} 震动 {:?}", event, sound, haptic)
        }
        ServerMessage::Profile(p) => profile_summary(p),
        ServerMessage::Info { message } => format!("[信息] {}", message),
        ServerMessage::Error { message } => format!("[错误] {}", message),
    }
}
