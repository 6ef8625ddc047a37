use anyhow::{Context, Result, bail};
use card_arcade_core::{Card, ClientMessage, HandCategory, TrainerMode};

/// 控制台输入解析的结果
#[derive(Debug, PartialEq)]
pub enum Command {
    Send(ClientMessage),
    Help,
    Quit,
}

pub const HELP: &str = "\
可用命令:
  catch start | pause | resume | restart | exit
  grab <牌>                 - 接住一张下落的牌，如 grab AH、grab 10s、grab Q♦
  trainer endless           - 无尽模式：答错即结束
  trainer rounds [n]        - 固定轮数，默认 10 轮
  answer <牌型>             - 如 answer two-pair、answer royal-flush
  next | restart-trainer
  profile
  sound on|off | vibration on|off
  onboarded | reset
  help | quit";

fn parse_switch(arg: Option<&str>) -> Result<bool> {
    match arg {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("用法: on 或 off"),
    }
}

pub fn parse_command(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let arg = parts.get(1).copied();

    let msg = match parts.first().copied() {
        Some("help") => return Ok(Command::Help),
        Some("quit") => return Ok(Command::Quit),
        Some("catch") => match arg {
            Some("start") => ClientMessage::StartDeckCatch,
            Some("pause") => ClientMessage::PauseDeckCatch,
            Some("resume") => ClientMessage::ResumeDeckCatch,
            Some("restart") => ClientMessage::RestartDeckCatch,
            Some("exit") => ClientMessage::ExitDeckCatch,
            _ => bail!("用法: catch start|pause|resume|restart|exit"),
        },
        Some("grab") => {
            let text = arg.context("用法: grab <牌>")?;
            let card: Card = text.parse().with_context(|| format!("无法识别的牌: {}", text))?;
            ClientMessage::CatchCard(card)
        }
        Some("trainer") => match arg {
            Some("endless") => ClientMessage::StartTrainer(TrainerMode::Endless),
            Some("rounds") => {
                let rounds = match parts.get(2) {
                    Some(n) => n.parse::<u32>().with_context(|| format!("无效的轮数: {}", n))?,
                    None => 10,
                };
                if rounds == 0 {
                    bail!("轮数必须大于 0");
                }
                ClientMessage::StartTrainer(TrainerMode::FixedRounds(rounds))
            }
            _ => bail!("用法: trainer endless|rounds [n]"),
        },
        Some("answer") => {
            let text = arg.context("用法: answer <牌型>")?;
            let category: HandCategory = text.parse().with_context(|| format!("无法识别的牌型: {}", text))?;
            category.into()
        }
        Some("next") => ClientMessage::NextRound,
        Some("restart-trainer") => ClientMessage::RestartTrainer,
        Some("profile") => ClientMessage::GetProfile,
        Some("sound") => ClientMessage::SetSoundEnabled(parse_switch(arg)?),
        Some("vibration") => ClientMessage::SetVibrationEnabled(parse_switch(arg)?),
        Some("onboarded") => ClientMessage::CompleteOnboarding,
        Some("reset") => ClientMessage::ResetProgress,
        Some(other) => bail!("未知命令: {}", other),
        None => bail!("请输入命令，help 查看帮助"),
    };
    Ok(Command::Send(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_arcade_core::{Rank, Suit};

    fn sent(line: &str) -> ClientMessage {
        match parse_command(line).unwrap() {
            Command::Send(msg) => msg,
            other => panic!("期望消息，得到 {:?}", other),
        }
    }

    #[test]
    fn deck_catch_commands() {
        assert_eq!(sent("catch start"), ClientMessage::StartDeckCatch);
        assert_eq!(sent("  catch   pause "), ClientMessage::PauseDeckCatch);
        assert_eq!(sent("grab 10s"), ClientMessage::CatchCard(Card::new(Rank::Ten, Suit::Spade)));
        assert_eq!(sent("grab AH"), ClientMessage::CatchCard(Card::new(Rank::Ace, Suit::Heart)));
        assert!(parse_command("grab").is_err());
        assert!(parse_command("grab 1x").is_err());
    }

    #[test]
    fn trainer_commands() {
        assert_eq!(sent("trainer endless"), ClientMessage::StartTrainer(TrainerMode::Endless));
        assert_eq!(sent("trainer rounds"), ClientMessage::StartTrainer(TrainerMode::FixedRounds(10)));
        assert_eq!(sent("trainer rounds 3"), ClientMessage::StartTrainer(TrainerMode::FixedRounds(3)));
        assert!(parse_command("trainer rounds 0").is_err());
        assert_eq!(sent("answer two-pair"), ClientMessage::Answer(HandCategory::TwoPair));
        assert!(parse_command("answer three-pair").is_err());
    }

    #[test]
    fn profile_commands() {
        assert_eq!(sent("sound off"), ClientMessage::SetSoundEnabled(false));
        assert_eq!(sent("vibration on"), ClientMessage::SetVibrationEnabled(true));
        assert!(parse_command("sound maybe").is_err());
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
        assert!(parse_command("").is_err());
    }
}
