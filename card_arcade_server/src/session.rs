use std::sync::Arc;

use card_arcade_core::{
    ClientMessage, DeckCatch, DeckCatchConfig, DeckCatchPhase, FeedbackEvent, FeedbackSink, GameConfig, GameError,
    Profile, ServerMessage, SessionContext, Trainer, TrainerMode,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::JsonFileStore;

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// 把核心发出的反馈事件转成发给客户端的提示，按当前设置过滤音效/震动
pub struct ChannelFeedback {
    tx: Outbox,
    store: Arc<JsonFileStore>,
}

impl ChannelFeedback {
    pub fn new(tx: Outbox, store: Arc<JsonFileStore>) -> Self {
        ChannelFeedback { tx, store }
    }
}

impl FeedbackSink for ChannelFeedback {
    fn emit(&self, event: FeedbackEvent) {
        let settings = self.store.settings();
        let msg = ServerMessage::Feedback {
            event,
            sound: settings.sound_enabled.then(|| event.sound()),
            haptic: settings.vibration_enabled.then(|| event.haptic()),
        };
        // 通道关闭说明连接已断开，由连接任务负责清理
        let _ = self.tx.send(msg);
    }
}

/// 单个连接上的游戏会话
///
/// 同一时间最多各持有一个接牌引擎和一个训练引擎。
/// 接牌引擎由后台的 driver 任务按三个频率驱动，暂停、退出、结束或断开时停止。
pub struct Session {
    id: Uuid,
    config: GameConfig,
    store: Arc<JsonFileStore>,
    tx: Outbox,
    ctx: SessionContext,
    deck_catch: Arc<Mutex<Option<DeckCatch>>>,
    driver: Option<JoinHandle<()>>,
    trainer: Arc<Mutex<Option<Trainer>>>,
    finish_timer: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(config: GameConfig, store: Arc<JsonFileStore>, tx: Outbox) -> Self {
        let feedback = Arc::new(ChannelFeedback::new(tx.clone(), store.clone()));
        let ctx = SessionContext::new(feedback, store.clone());
        Session {
            id: Uuid::new_v4(),
            config,
            store,
            tx,
            ctx,
            deck_catch: Arc::new(Mutex::new(None)),
            driver: None,
            trainer: Arc::new(Mutex::new(None)),
            finish_timer: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn send(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg);
    }

    /// 非法的状态迁移只记录日志，不回复客户端
    fn ignore(&self, err: GameError) {
        debug!("会话 {}: {}", self.id, err);
    }

    pub fn handle(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::StartDeckCatch => self.start_deck_catch(),
            ClientMessage::PauseDeckCatch => {
                self.stop_driver();
                self.with_deck_catch(|game| game.pause());
            }
            ClientMessage::ResumeDeckCatch => {
                if self.with_deck_catch(|game| game.resume()) {
                    self.start_driver();
                }
            }
            ClientMessage::RestartDeckCatch => {
                self.stop_driver();
                if self.with_deck_catch(|game| {
                    game.restart();
                    Ok(())
                }) {
                    self.start_driver();
                }
            }
            ClientMessage::ExitDeckCatch => {
                self.stop_driver();
                if self.deck_catch.lock().take().is_some() {
                    info!("会话 {}: 退出接牌", self.id);
                }
            }
            ClientMessage::CatchCard(card) => {
                self.with_deck_catch(|game| game.catch(&card).map(|_| ()));
                if self.deck_catch_over() {
                    self.stop_driver();
                }
            }

            ClientMessage::StartTrainer(mode) => self.start_trainer(Some(mode)),
            ClientMessage::RestartTrainer => self.start_trainer(None),
            ClientMessage::Answer(category) => {
                let pending = self.with_trainer(|trainer| trainer.answer(category).map(|_| trainer.is_finish_pending()));
                if pending == Some(true) {
                    self.schedule_finish();
                }
            }
            ClientMessage::NextRound => {
                if self.with_trainer(|trainer| trainer.next_round()).is_some() {
                    self.cancel_finish();
                }
            }

            ClientMessage::GetProfile => self.send(ServerMessage::Profile(self.store.profile())),
            ClientMessage::SetSoundEnabled(enabled) => {
                self.update_profile(|p| p.settings.sound_enabled = enabled)
            }
            ClientMessage::SetVibrationEnabled(enabled) => {
                self.update_profile(|p| p.settings.vibration_enabled = enabled)
            }
            ClientMessage::CompleteOnboarding => self.update_profile(|p| p.settings.has_onboarded = true),
            ClientMessage::ResetProgress => {
                self.update_profile(|p| p.reset_progress());
                info!("会话 {}: 已清空所有成绩", self.id);
            }
        }
    }

    fn update_profile(&self, f: impl FnOnce(&mut Profile)) {
        let profile = self.store.update_profile(|p| {
            f(p);
            p.clone()
        });
        self.send(ServerMessage::Profile(profile));
    }

    // --- 接牌 ---

    fn start_deck_catch(&mut self) {
        let started = {
            let mut guard = self.deck_catch.lock();
            let game = guard.get_or_insert_with(|| DeckCatch::new(self.config.deck_catch.clone(), self.ctx.clone()));
            match game.start() {
                Ok(()) => Some(game.snapshot()),
                Err(e) => {
                    self.ignore(e);
                    None
                }
            }
        };
        if let Some(snapshot) = started {
            info!("会话 {}: 开始接牌", self.id);
            self.send(snapshot.into());
            self.start_driver();
        }
    }

    /// 对当前接牌引擎执行一个操作，成功后推送快照
    fn with_deck_catch(&self, f: impl FnOnce(&mut DeckCatch) -> Result<(), GameError>) -> bool {
        let result = {
            let mut guard = self.deck_catch.lock();
            let Some(game) = guard.as_mut() else {
                debug!("会话 {}: 没有进行中的接牌", self.id);
                return false;
            };
            f(game).map(|()| game.snapshot())
        };
        match result {
            Ok(snapshot) => {
                self.send(snapshot.into());
                true
            }
            Err(e) => {
                self.ignore(e);
                false
            }
        }
    }

    fn deck_catch_over(&self) -> bool {
        self.deck_catch
            .lock()
            .as_ref()
            .is_some_and(|game| game.phase() == DeckCatchPhase::GameOver)
    }

    fn start_driver(&mut self) {
        self.stop_driver();
        self.driver = Some(spawn_driver(
            self.deck_catch.clone(),
            self.tx.clone(),
            self.config.deck_catch.clone(),
        ));
    }

    fn stop_driver(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
    }

    // --- 牌型训练 ---

    fn start_trainer(&mut self, mode: Option<TrainerMode>) {
        self.cancel_finish();
        let result = {
            let mut guard = self.trainer.lock();
            match guard.as_mut() {
                Some(trainer) => match mode {
                    Some(mode) => trainer.start_session(mode),
                    None => trainer.restart(),
                }
                .map(|()| trainer.snapshot()),
                None => {
                    let Some(mode) = mode else {
                        debug!("会话 {}: 没有可以重新开始的训练", self.id);
                        return;
                    };
                    Trainer::start(self.config.trainer.clone(), self.ctx.clone(), mode)
                        .map(|trainer| guard.insert(trainer).snapshot())
                }
            }
        };
        match result {
            Ok(snapshot) => {
                info!("会话 {}: 开始牌型训练 {:?}", self.id, snapshot.mode);
                self.send(snapshot.into());
            }
            Err(e) => self.ignore(e),
        }
    }

    fn with_trainer<T>(&self, f: impl FnOnce(&mut Trainer) -> Result<T, GameError>) -> Option<T> {
        let result = {
            let mut guard = self.trainer.lock();
            let Some(trainer) = guard.as_mut() else {
                debug!("会话 {}: 没有进行中的训练", self.id);
                return None;
            };
            f(trainer).map(|out| (out, trainer.snapshot()))
        };
        match result {
            Ok((out, snapshot)) => {
                self.send(snapshot.into());
                Some(out)
            }
            Err(e) => {
                self.ignore(e);
                None
            }
        }
    }

    /// 最后一轮的结果展示一段时间后结束会话
    fn schedule_finish(&mut self) {
        self.cancel_finish();
        let trainer = self.trainer.clone();
        let tx = self.tx.clone();
        let delay = self.config.trainer.result_delay();
        self.finish_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let snapshot = {
                let mut guard = trainer.lock();
                let Some(trainer) = guard.as_mut() else { return };
                if trainer.finish_pending_session().is_err() {
                    return;
                }
                trainer.snapshot()
            };
            let _ = tx.send(snapshot.into());
        }));
    }

    fn cancel_finish(&mut self) {
        if let Some(handle) = self.finish_timer.take() {
            handle.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_driver();
        self.cancel_finish();
    }
}

enum Beat {
    Clock,
    Spawn,
    Frame,
}

/// 接牌的后台驱动：计时、出牌、逐帧推进，每次出牌和每帧后推送快照。
/// 引擎离开 Playing 阶段后任务自行退出。
fn spawn_driver(engine: Arc<Mutex<Option<DeckCatch>>>, tx: Outbox, config: DeckCatchConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let clock_dt = config.clock_interval();
        let spawn_dt = config.spawn_interval();
        let frame_dt = config.frame_interval();
        let now = Instant::now();
        let mut clock = interval_at(now + clock_dt, clock_dt);
        let mut spawner = interval_at(now + spawn_dt, spawn_dt);
        let mut frame = interval_at(now + frame_dt, frame_dt);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let beat = tokio::select! {
                _ = clock.tick() => Beat::Clock,
                _ = spawner.tick() => Beat::Spawn,
                _ = frame.tick() => Beat::Frame,
            };

            let (snapshot, playing) = {
                let mut guard = engine.lock();
                let Some(game) = guard.as_mut() else { break };
                let changed = match beat {
                    Beat::Clock => {
                        game.clock_tick(clock_dt);
                        false
                    }
                    Beat::Spawn => {
                        game.spawn();
                        true
                    }
                    Beat::Frame => {
                        game.tick(frame_dt);
                        true
                    }
                };
                let playing = game.phase() == DeckCatchPhase::Playing;
                ((changed || !playing).then(|| game.snapshot()), playing)
            };

            if let Some(snapshot) = snapshot {
                if tx.send(snapshot.into()).is_err() {
                    break;
                }
            }
            if !playing {
                debug!("接牌驱动退出");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_arcade_core::{Card, DeckCatchSnapshot, HandCategory, Rank, Suit, TrainerPhase, TrainerSnapshot};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn setup() -> (Session, UnboundedReceiver<ServerMessage>, Arc<JsonFileStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("stats.json")).unwrap());
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(GameConfig::default(), store.clone(), tx);
        (session, rx, store, dir)
    }

    fn trainer_over(session: &Session) -> bool {
        session
            .trainer
            .lock()
            .as_ref()
            .is_some_and(|trainer| trainer.phase() == TrainerPhase::GameOver)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn last_deck_catch(messages: &[ServerMessage]) -> Option<DeckCatchSnapshot> {
        messages.iter().rev().find_map(|m| match m {
            ServerMessage::DeckCatch(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn last_trainer(messages: &[ServerMessage]) -> Option<TrainerSnapshot> {
        messages.iter().rev().find_map(|m| match m {
            ServerMessage::Trainer(s) => Some(s.clone()),
            _ => None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn driver_spawns_on_interval() {
        let (mut session, mut rx, _store, _dir) = setup();
        session.handle(ClientMessage::StartDeckCatch);
        let first = last_deck_catch(&drain(&mut rx)).unwrap();
        assert_eq!(first.phase, DeckCatchPhase::Playing);
        assert_eq!(first.remaining, 51);
        assert_eq!(first.falling.len(), 1);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        let later = last_deck_catch(&drain(&mut rx)).unwrap();
        assert_eq!(later.remaining, 50);
        assert_eq!(later.falling.len(), 2);
        assert!(later.elapsed_secs > 1.4);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_the_driver() {
        let (mut session, mut rx, _store, _dir) = setup();
        session.handle(ClientMessage::StartDeckCatch);
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.handle(ClientMessage::PauseDeckCatch);
        let paused = last_deck_catch(&drain(&mut rx)).unwrap();
        assert_eq!(paused.phase, DeckCatchPhase::Paused);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());

        session.handle(ClientMessage::ResumeDeckCatch);
        tokio::time::sleep(Duration::from_millis(1600)).await;
        let resumed = last_deck_catch(&drain(&mut rx)).unwrap();
        assert_eq!(resumed.phase, DeckCatchPhase::Playing);
        assert_eq!(resumed.remaining, 50);
        assert_eq!(resumed.falling.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn catching_a_falling_card_counts() {
        let (mut session, mut rx, _store, _dir) = setup();
        session.handle(ClientMessage::StartDeckCatch);
        let first = last_deck_catch(&drain(&mut rx)).unwrap();
        let card = first.falling[0].card;

        session.handle(ClientMessage::CatchCard(card));
        let messages = drain(&mut rx);
        assert!(messages.iter().any(|m| matches!(
            m,
            ServerMessage::Feedback { event: FeedbackEvent::Success, sound: Some(_), haptic: Some(_) }
        )));
        let after = last_deck_catch(&messages).unwrap();
        assert_eq!(after.collected, 1);
        assert!(after.falling.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_every_card_ends_and_persists() {
        let (mut session, mut rx, store, _dir) = setup();
        session.handle(ClientMessage::SetSoundEnabled(false));
        session.handle(ClientMessage::StartDeckCatch);

        tokio::time::sleep(Duration::from_secs(120)).await;
        let messages = drain(&mut rx);
        let last = last_deck_catch(&messages).unwrap();
        assert_eq!(last.phase, DeckCatchPhase::GameOver);
        assert_eq!(last.missed, 52);
        assert_eq!(last.collected, 0);

        // 关闭音效后只剩震动提示
        assert!(messages.iter().any(|m| matches!(
            m,
            ServerMessage::Feedback { event: FeedbackEvent::Error, sound: None, haptic: Some(_) }
        )));

        let profile = store.profile();
        assert_eq!(profile.deck_catch_sessions, 1);
        assert_eq!(profile.deck_catch_best_time, 0.0);
        assert!(store.path().exists());

        // 结束后驱动已经退出
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exit_discards_the_session() {
        let (mut session, mut rx, store, _dir) = setup();
        session.handle(ClientMessage::StartDeckCatch);
        session.handle(ClientMessage::ExitDeckCatch);
        drain(&mut rx);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut rx).is_empty());

        session.handle(ClientMessage::CatchCard(Card::new(Rank::Ace, Suit::Spade)));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(store.profile().deck_catch_sessions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn last_round_finishes_after_delay() {
        let (mut session, mut rx, store, _dir) = setup();
        session.handle(ClientMessage::StartTrainer(TrainerMode::FixedRounds(1)));
        let snapshot = last_trainer(&drain(&mut rx)).unwrap();
        assert_eq!(snapshot.correct_category, None);
        assert_eq!(snapshot.hand.len(), 5);

        session.handle(ClientMessage::Answer(HandCategory::HighCard));
        let answered = last_trainer(&drain(&mut rx)).unwrap();
        assert!(answered.showing_result);
        assert!(answered.finish_pending);
        assert!(answered.correct_category.is_some());
        assert_eq!(answered.phase, TrainerPhase::Playing);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let finished = last_trainer(&drain(&mut rx)).unwrap();
        assert_eq!(finished.phase, TrainerPhase::GameOver);
        assert!(trainer_over(&session));
        assert_eq!(store.profile().trainer_sessions, 1);
        assert_eq!(store.profile().trainer_total_answers, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn next_round_before_delay_finishes_once() {
        let (mut session, mut rx, store, _dir) = setup();
        session.handle(ClientMessage::StartTrainer(TrainerMode::FixedRounds(1)));
        session.handle(ClientMessage::Answer(HandCategory::OnePair));
        session.handle(ClientMessage::NextRound);
        assert!(trainer_over(&session));
        drain(&mut rx);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(last_trainer(&drain(&mut rx)).is_none());
        assert_eq!(store.profile().trainer_sessions, 1);
    }

    #[tokio::test]
    async fn settings_round_trip_through_profile() {
        let (mut session, mut rx, store, _dir) = setup();
        session.handle(ClientMessage::SetVibrationEnabled(false));
        session.handle(ClientMessage::CompleteOnboarding);
        session.handle(ClientMessage::ResetProgress);
        session.handle(ClientMessage::GetProfile);
        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 4);
        let ServerMessage::Profile(profile) = messages.last().unwrap() else {
            panic!("期望 Profile 消息");
        };
        assert!(!profile.settings.vibration_enabled);
        assert!(profile.settings.has_onboarded);

        let reopened = JsonFileStore::open(store.path()).unwrap();
        assert!(reopened.profile().settings.has_onboarded);
    }
}
