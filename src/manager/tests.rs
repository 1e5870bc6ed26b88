//! End-to-end routing through the manager on a paused clock.

use super::*;
use crate::db::test_database;
use crate::game::building::{Nav, nav_data, option_data};
use crate::game::matches::snapshot::sample_snapshot;
use crate::game::{MatchState, ScriptedDice};
use crate::network::recording::RecordingTransport;
use crate::state::UserStatus;
use crate::ui::{self, buttons, data};
use lexparty_proto::{CallbackQuery, IncomingMessage, MessageId, Sendable, UserProfile};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

const HOST: UserId = 1;
const PLAYER: UserId = 2;
const WAIT: Duration = Duration::from_secs(60);

const CONFIG: &str = r#"
[bot]
token = "123:abc"
admin_username = "boss"

[game]
categories = ["Город", "Имя", "Бренд", "Еда"]
alphabet = "АБВ"
"#;

/// Clock replaying `ticks`, then counting up.
fn scripted_clock(ticks: &[u128]) -> Clock {
    let queue = parking_lot::Mutex::new(ticks.iter().copied().collect::<VecDeque<_>>());
    let next = AtomicU64::new(1_000);
    Arc::new(move || {
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| u128::from(next.fetch_add(1, Ordering::Relaxed)))
    })
}

fn profile(user: UserId) -> UserProfile {
    UserProfile::new(user, format!("user{user}")).with_username(format!("user{user}"))
}

struct Harness {
    manager: Arc<Manager>,
    transport: Arc<RecordingTransport>,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_clock(scripted_clock(&[]))
    }

    fn with_clock(clock: Clock) -> Self {
        let config = Config::parse(CONFIG).unwrap();
        let (db, dir) = test_database();
        let transport = Arc::new(RecordingTransport::new());
        let deps = ManagerDeps {
            transport: transport.clone(),
            dice: Arc::new(ScriptedDice::new()),
            clock,
        };
        Self {
            manager: Manager::new(&config, Arc::new(db), deps),
            transport,
            _dir: dir,
        }
    }

    async fn say(&self, user: UserId, text: &str) {
        self.say_as(profile(user), text).await;
    }

    async fn say_as(&self, from: UserProfile, text: &str) {
        self.manager.dispatch(Update::text_from(from, 1, text)).await;
    }

    async fn click(&self, user: UserId, message_id: MessageId, payload: &str) {
        let update = Update::callback_from(profile(user), "q", message_id, payload);
        self.manager.dispatch(update).await;
    }

    /// Latest builder prompt sent to `user`.
    async fn prompt(&self, user: UserId) -> MessageId {
        self.transport
            .wait_for(WAIT, |t| {
                t.sent_to(user)
                    .into_iter()
                    .rev()
                    .find(|s| s.id.is_some() && s.msg.inline_keyboard().is_some())
                    .and_then(|s| s.id)
            })
            .await
            .expect("builder prompt")
    }

    async fn click_prompt(&self, user: UserId, payload: &str) {
        let id = self.prompt(user).await;
        self.click(user, id, payload).await;
    }

    /// Walk the builder with one round of 30 seconds and no extras, and
    /// return the code of the opened room.
    async fn build_room(&self, host: UserId) -> u32 {
        self.say(host, buttons::CREATE).await;
        for i in 0..3 {
            self.click_prompt(host, &option_data(i)).await;
        }
        self.click_prompt(host, &nav_data(Nav::Next)).await;
        self.click_prompt(host, &option_data(0)).await;
        self.click_prompt(host, &option_data(0)).await;
        self.click_prompt(host, &nav_data(Nav::Next)).await;
        self.click_prompt(host, &option_data(1)).await;
        self.click_prompt(host, &option_data(1)).await;
        self.click_prompt(host, &nav_data(Nav::Done)).await;

        let manager = Arc::clone(&self.manager);
        self.transport
            .wait_for(WAIT, move |_| manager.match_of(host).map(|m| m.code()))
            .await
            .expect("room opened")
    }

    async fn join(&self, user: UserId, code: u32) {
        self.say(user, buttons::JOIN).await;
        self.say(user, &code.to_string()).await;
    }

    async fn button(&self, user: UserId, payload: &str) -> MessageId {
        self.transport
            .wait_for(WAIT, |t| t.message_with_button(user, payload))
            .await
            .unwrap_or_else(|| panic!("no {payload} button for {user}"))
    }

    async fn wait_until(&self, check: impl Fn(&Manager) -> bool) {
        let manager = Arc::clone(&self.manager);
        self.transport
            .wait_for(WAIT * 10, move |_| check(&manager).then_some(()))
            .await
            .expect("condition not reached");
    }
}

#[tokio::test(start_paused = true)]
async fn single_player_match_records_a_win() {
    let h = Harness::new();
    let code = h.build_room(HOST).await;
    assert!(h.transport.saw(HOST, &ui::room_created(code)));
    assert_eq!(h.manager.building_count(), 0);

    h.join(PLAYER, code).await;
    assert!(h.transport.saw(PLAYER, &ui::joined(code)));
    h.say(HOST, buttons::START).await;

    let ready = h.button(PLAYER, data::READY).await;
    h.click(PLAYER, ready, data::READY).await;
    let timer = h.button(PLAYER, data::STOP).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.click(PLAYER, timer, data::STOP).await;

    let session = h.manager.match_by_code(code).unwrap();
    h.wait_until(|_| session.state() == MatchState::Finished).await;

    h.say(PLAYER, buttons::LEAVE).await;
    h.wait_until(|m| m.match_count() == 0).await;
    assert!(h.manager.match_of(HOST).is_none());

    let stats = h.manager.db().stats().aggregate(PLAYER).unwrap();
    assert_eq!(stats.games, 1);
    assert_eq!(stats.wins, 1);
    let player = h.manager.db().users().fetch(PLAYER).unwrap().unwrap();
    assert_eq!(player.stars, 1);
}

#[tokio::test(start_paused = true)]
async fn group_chats_are_refused() {
    let h = Harness::new();
    let update = Update::Message(IncomingMessage {
        message_id: 1,
        chat_id: -500,
        from: profile(HOST),
        text: "/start".into(),
        is_group: true,
    });
    h.manager.dispatch(update).await;
    assert!(h.transport.saw(-500, ui::GROUP_CHAT));
    assert!(!h.transport.saw(-500, ui::GREETING));

    // Taps on a keyboard posted in a group are refused the same way.
    let tap = Update::CallbackQuery(CallbackQuery {
        id: "g1".into(),
        from: profile(HOST),
        chat_id: -600,
        message_id: 7,
        data: data::READY.into(),
        is_group: true,
    });
    h.manager.dispatch(tap).await;
    assert!(h.transport.saw(-600, ui::GROUP_CHAT));
    assert!(
        h.transport
            .find(|s| matches!(&s.msg, Sendable::AnswerCallback { .. }))
            .is_some()
    );
}

#[tokio::test(start_paused = true)]
async fn banned_users_are_refused() {
    let h = Harness::new();
    let users = h.manager.db().users();
    users.resolve(&profile(PLAYER), "boss").unwrap();
    users.set_status(PLAYER, UserStatus::Banned).unwrap();

    h.say(PLAYER, "/start").await;
    assert!(h.transport.saw(PLAYER, ui::BANNED));
    assert!(!h.transport.saw(PLAYER, ui::GREETING));
}

#[tokio::test(start_paused = true)]
async fn unknown_text_gets_a_hint() {
    let h = Harness::new();
    h.say(HOST, "привет").await;
    assert!(h.transport.saw(HOST, ui::HINT));
    h.say(HOST, "/start").await;
    assert!(h.transport.saw(HOST, ui::GREETING));
}

#[tokio::test(start_paused = true)]
async fn join_rejects_bad_and_unknown_codes() {
    let h = Harness::new();
    h.say(PLAYER, buttons::JOIN).await;
    assert!(h.transport.saw(PLAYER, ui::ASK_CODE));
    h.say(PLAYER, "abc").await;
    assert!(h.transport.saw(PLAYER, "должен быть числом"));

    h.say(PLAYER, buttons::JOIN).await;
    h.say(PLAYER, "9999").await;
    assert!(h.transport.saw(PLAYER, "Комнаты с кодом 9999 не существует."));

    // The awaited reply is consumed once.
    h.say(PLAYER, "9999").await;
    assert!(h.transport.saw(PLAYER, ui::HINT));
}

#[tokio::test(start_paused = true)]
async fn commands_cancel_an_awaited_reply() {
    let h = Harness::new();
    h.say(PLAYER, buttons::JOIN).await;
    h.say(PLAYER, "/rules").await;
    h.say(PLAYER, "42").await;
    assert!(h.transport.saw(PLAYER, ui::HINT));
    assert!(!h.transport.saw(PLAYER, "Комнаты с кодом 42"));
}

#[tokio::test(start_paused = true)]
async fn admin_commands_check_the_caller() {
    let h = Harness::new();
    h.say(PLAYER, "/add").await;
    assert!(h.transport.saw(PLAYER, "только администратору"));

    let admin = UserProfile::new(9, "Boss").with_username("boss");
    h.say_as(admin.clone(), "/add").await;
    h.say_as(admin.clone(), "Река").await;
    assert!(h.manager.default_categories().iter().any(|c| c == "Река"));
    assert!(h.transport.saw(9, &ui::category_added("Река")));

    h.say(PLAYER, "/start").await;
    h.say_as(admin.clone(), "/ban").await;
    h.say_as(admin, "@user2").await;
    let banned = h.manager.db().users().fetch(PLAYER).unwrap().unwrap();
    assert!(banned.is_banned());
}

#[tokio::test(start_paused = true)]
async fn inline_arguments_skip_the_question() {
    let h = Harness::new();
    h.say(PLAYER, "/start").await;
    h.say(HOST, "/profile @user2").await;
    assert!(h.transport.saw(HOST, "Профиль user2"));
    assert!(!h.transport.saw(HOST, ui::ASK_USERNAME));

    let admin = UserProfile::new(9, "Boss").with_username("boss");
    h.say_as(admin, "/ban @user2").await;
    assert!(!h.transport.saw(9, ui::ASK_USERNAME));
    let banned = h.manager.db().users().fetch(PLAYER).unwrap().unwrap();
    assert!(banned.is_banned());

    // Without an argument the command still asks.
    h.say(HOST, "/profile").await;
    assert!(h.transport.saw(HOST, ui::ASK_USERNAME));
}

#[tokio::test(start_paused = true)]
async fn busy_users_cannot_open_a_second_session() {
    let h = Harness::new();
    h.say(HOST, buttons::CREATE).await;
    h.prompt(HOST).await;
    h.say(HOST, buttons::CREATE).await;
    assert!(h.transport.saw(HOST, "Сначала покиньте её."));
    assert_eq!(h.manager.building_count(), 1);

    h.say(HOST, buttons::LEAVE).await;
    h.wait_until(|m| m.building_count() == 0).await;
    assert!(h.transport.saw(HOST, ui::LEFT_GAME));
}

#[tokio::test(start_paused = true)]
async fn colliding_codes_are_redrawn() {
    let other = (6u128..)
        .find(|n| code::code_for(*n) != code::code_for(5))
        .unwrap();
    let h = Harness::with_clock(scripted_clock(&[5, 5, other]));

    let first = h.build_room(HOST).await;
    let second = h.build_room(PLAYER).await;
    assert_eq!(first, code::code_for(5));
    assert_eq!(second, code::code_for(other));
    assert_eq!(h.manager.match_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn host_leaving_a_waiting_room_closes_it() {
    let h = Harness::new();
    let code = h.build_room(HOST).await;
    h.join(PLAYER, code).await;

    h.say(HOST, buttons::LEAVE).await;
    h.wait_until(|m| m.match_count() == 0).await;
    assert!(h.manager.match_of(PLAYER).is_none());
    assert!(h.transport.saw(PLAYER, ui::MATCH_ABORTED));
    assert!(h.manager.db().snapshots().load_all().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn only_the_host_starts_the_match() {
    let h = Harness::new();
    let code = h.build_room(HOST).await;
    h.say(HOST, buttons::START).await;
    assert!(h.transport.saw(HOST, "Нужен хотя бы один игрок."));

    h.join(PLAYER, code).await;
    h.say(PLAYER, buttons::START).await;
    assert!(h.transport.saw(PLAYER, "только ведущий"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_snapshots_live_matches() {
    let h = Harness::new();
    let code = h.build_room(HOST).await;
    h.join(PLAYER, code).await;
    h.say(3, buttons::CREATE).await;
    h.prompt(3).await;

    h.manager.shutdown().await;
    assert_eq!(h.manager.match_count(), 0);
    assert_eq!(h.manager.building_count(), 0);

    let snapshots = h.manager.db().snapshots().load_all().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].code, code);
    assert_eq!(snapshots[0].state, MatchState::Waiting);
    assert!(!h.transport.saw(PLAYER, ui::MATCH_ABORTED));
}

#[tokio::test(start_paused = true)]
async fn match_interrupted_mid_round_resumes_after_restart() {
    let h = Harness::new();
    let code = h.build_room(HOST).await;
    h.join(PLAYER, code).await;
    h.join(3, code).await;
    h.say(HOST, buttons::START).await;

    // The first joiner takes the first turn.
    let ready = h.button(PLAYER, data::READY).await;
    h.click(PLAYER, ready, data::READY).await;
    let timer = h.button(PLAYER, data::STOP).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.click(PLAYER, timer, data::STOP).await;
    let session = h.manager.match_by_code(code).unwrap();
    h.wait_until(|_| session.player(PLAYER).is_some_and(|p| p.rates.len() == 1))
        .await;

    h.manager.shutdown().await;
    let snapshots = h.manager.db().snapshots().load_all().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].state, MatchState::Playing);
    assert_eq!(snapshots[0].round, 0);

    // A new process over the same database.
    let transport = Arc::new(RecordingTransport::new());
    let deps = ManagerDeps {
        transport: transport.clone(),
        dice: Arc::new(ScriptedDice::new()),
        clock: scripted_clock(&[]),
    };
    let config = Config::parse(CONFIG).unwrap();
    let manager = Manager::new(&config, Arc::clone(&h.manager.db), deps);
    manager.restore();
    assert_eq!(manager.match_of(3).map(|m| m.code()), Some(code));

    // Only the player still owed a turn is prompted.
    let ready = transport
        .wait_for(WAIT, |t| t.message_with_button(3, data::READY))
        .await
        .expect("remaining turn resumed");
    assert!(transport.message_with_button(PLAYER, data::READY).is_none());
    manager
        .dispatch(Update::callback_from(profile(3), "q", ready, data::READY))
        .await;
    let timer = transport
        .wait_for(WAIT, |t| t.message_with_button(3, data::STOP))
        .await
        .expect("timer");
    tokio::time::sleep(Duration::from_secs(3)).await;
    manager
        .dispatch(Update::callback_from(profile(3), "q", timer, data::STOP))
        .await;

    let restored = manager.match_by_code(code).unwrap();
    transport
        .wait_for(WAIT * 10, |_| (restored.state() == MatchState::Finished).then_some(()))
        .await
        .expect("match finished");
    let players = restored.players();
    assert!(players.iter().all(|p| p.rates.len() == 1 && p.rates[0].points > 0));

    for user in [PLAYER, 3] {
        manager
            .dispatch(Update::text_from(profile(user), 1, buttons::LEAVE))
            .await;
    }
    transport
        .wait_for(WAIT, |_| (manager.match_count() == 0).then_some(()))
        .await
        .expect("match released");
    for user in [PLAYER, 3] {
        assert_eq!(manager.db().stats().aggregate(user).unwrap().games, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn restore_rebuilds_matches_and_membership() {
    let h = Harness::new();
    h.manager.db().snapshots().save(&sample_snapshot(77)).unwrap();

    h.manager.restore();
    let session = h.manager.match_by_code(77).expect("restored match");
    assert_eq!(session.round(), 1);
    for user in [1, 101, 102, 103] {
        assert_eq!(h.manager.match_of(user).map(|m| m.code()), Some(77));
    }
    assert!(h.manager.db().snapshots().load_all().unwrap().is_empty());

    // The restored match carries on with the next round.
    h.transport
        .wait_for(WAIT, |t| {
            [101, 102, 103]
                .into_iter()
                .find_map(|u| t.message_with_button(u, data::READY))
        })
        .await
        .expect("next round started");
}

#[tokio::test(start_paused = true)]
async fn run_stops_on_shutdown() {
    let h = Harness::new();
    let (tx, rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&h.manager).run(rx, shutdown.clone()));

    tx.send(Update::text_from(profile(HOST), 1, "/start")).await.unwrap();
    h.transport
        .wait_for(WAIT, |t| t.saw(HOST, ui::GREETING).then_some(()))
        .await
        .expect("greeting");

    shutdown.cancel();
    task.await.unwrap();
    assert_eq!(h.manager.registry().command_stats(), vec![("/start", 1)]);
}
