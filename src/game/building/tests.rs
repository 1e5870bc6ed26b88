//! Wizard scenarios on a paused clock with a recording transport.

use super::*;
use crate::game::testing::{Ended as HookEnded, recording_hooks};
use crate::network::recording::RecordingTransport;
use chrono::Utc;
use draft::{nav_data, option_data};
use lexparty_proto::UserProfile;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

const AUTHOR: UserId = 7;
const WAIT: Duration = Duration::from_secs(5);

fn author() -> User {
    User {
        id: AUTHOR,
        admin: false,
        first_name: "Anna".into(),
        last_name: None,
        language: None,
        username: Some("anna".into()),
        status: Default::default(),
        created_at: Utc::now(),
        stars: 0,
        bonus_count: 0,
    }
}

fn defaults() -> BuilderDefaults {
    BuilderDefaults {
        categories: ["Город", "Имя", "Бренд", "Еда"].map(String::from).to_vec(),
        letters: vec!['А', 'Б', 'В'],
        bonus: vec![Bonus::new("Шёпот", "Отвечай шёпотом.", 10, 0, 1.0)],
        policy: BonusPolicy::Weighted,
    }
}

struct Harness {
    transport: Arc<RecordingTransport>,
    session: Arc<BuildingSession>,
    ended: UnboundedReceiver<HookEnded>,
    parent: CancellationToken,
    handle: JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(Duration::from_secs(3600)).await
    }

    async fn start_with(lifetime: Duration) -> Self {
        let transport = Arc::new(RecordingTransport::new());
        let (hooks, ended) = recording_hooks();
        let parent = CancellationToken::new();
        let session = BuildingSession::new(
            &author(),
            defaults(),
            transport.clone(),
            lifetime,
            hooks,
            &parent,
        );
        let handle = tokio::spawn(Arc::clone(&session).run());
        let h = Self {
            transport,
            session,
            ended,
            parent,
            handle,
        };
        h.prompt().await;
        h
    }

    /// Id of the latest prompt.
    async fn prompt(&self) -> MessageId {
        self.transport
            .wait_for(WAIT, |t| {
                t.sent_to(AUTHOR)
                    .into_iter()
                    .rev()
                    .find(|s| s.id.is_some() && s.msg.inline_keyboard().is_some())
                    .and_then(|s| s.id)
            })
            .await
            .expect("builder prompt")
    }

    async fn click_on(&self, message_id: MessageId, payload: &str) -> HandlerResult {
        let update = Update::callback_from(UserProfile::new(AUTHOR, "Anna"), "q", message_id, payload);
        self.session.execute(&update).await
    }

    async fn click(&self, payload: &str) -> HandlerResult {
        let id = self.prompt().await;
        self.click_on(id, payload).await
    }

    async fn say(&self, text: &str) -> HandlerResult {
        let update = Update::text_from(UserProfile::new(AUTHOR, "Anna"), 1, text);
        self.session.execute(&update).await
    }

    async fn pick_three_categories(&self) {
        for i in 0..3 {
            self.click(&option_data(i)).await.unwrap();
        }
    }
}

#[tokio::test(start_paused = true)]
async fn full_walkthrough_produces_config() {
    let mut h = Harness::start().await;
    assert_eq!(h.session.stage().await, Stage::Categories);
    h.pick_three_categories().await;
    h.click(&nav_data(Nav::Next)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::RoundsNum);

    h.click(&option_data(1)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::RoundSecs);
    h.click(&option_data(2)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::Letters);
    h.click(&option_data(0)).await.unwrap();
    h.click(&nav_data(Nav::Next)).await.unwrap();
    h.click(&option_data(0)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::Vote);
    h.click(&option_data(1)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::Done);

    let summary = h.transport.texts_to(AUTHOR).into_iter().last().unwrap();
    assert!(summary.contains("Раундов: 2, секунд на ход: 60"));
    h.click(&nav_data(Nav::Done)).await.unwrap();

    assert_eq!(h.ended.recv().await, Some(HookEnded::Done));
    let config = h.session.config().unwrap();
    assert_eq!(config.author_id, AUTHOR);
    assert_eq!(config.author_name, "Anna");
    assert_eq!(config.rounds, 2);
    assert_eq!(config.round_secs, 60);
    assert_eq!(config.categories, vec!["Город", "Имя", "Бренд"]);
    assert_eq!(config.letters, vec!['Б', 'В']);
    assert!(config.bonus_enabled);
    assert_eq!(config.bonus.len(), 1);
    assert_eq!(config.bonus_policy, BonusPolicy::Weighted);
    assert!(!config.vote);
    assert_eq!(config.code, 0);
    h.handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn entering_a_stage_replaces_the_prompt() {
    let h = Harness::start().await;
    let first = h.prompt().await;
    h.click(&nav_data(Nav::Next)).await.unwrap();
    let second = h.prompt().await;
    assert_ne!(first, second);
    assert!(h.transport.find(|s| s.msg == Sendable::delete(AUTHOR, first)).is_some());

    let stale = h.click_on(first, &nav_data(Nav::Next)).await;
    assert!(stale.is_ok());
    assert_eq!(h.session.stage().await, Stage::RoundsNum);

    h.click(&nav_data(Nav::Prev)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::Categories);
    h.parent.cancel();
}

#[tokio::test(start_paused = true)]
async fn done_requires_categories_and_letters() {
    let mut h = Harness::start().await;
    for _ in 0..6 {
        h.click(&nav_data(Nav::Next)).await.unwrap();
    }
    assert_eq!(h.session.stage().await, Stage::Done);
    assert!(matches!(
        h.click(&nav_data(Nav::Done)).await,
        Err(crate::error::HandlerError::NotEnoughCategories)
    ));

    for _ in 0..6 {
        h.click(&nav_data(Nav::Prev)).await.unwrap();
    }
    h.pick_three_categories().await;
    h.click(&nav_data(Nav::Next)).await.unwrap();
    h.click(&option_data(0)).await.unwrap();
    h.click(&option_data(0)).await.unwrap();
    assert_eq!(h.session.stage().await, Stage::Letters);
    for i in 0..3 {
        h.click(&option_data(i)).await.unwrap();
    }
    for _ in 0..3 {
        h.click(&nav_data(Nav::Next)).await.unwrap();
    }
    assert!(matches!(
        h.click(&nav_data(Nav::Done)).await,
        Err(crate::error::HandlerError::NoLetters)
    ));
    assert_eq!(h.session.stage().await, Stage::Done);
    assert!(h.session.config().is_none());
    assert!(h.ended.try_recv().is_err());
    h.session.stop();
    assert_eq!(h.ended.recv().await, Some(HookEnded::Warn(WarnReason::Aborted)));
}

#[tokio::test(start_paused = true)]
async fn typed_category_is_added_enabled() {
    let mut h = Harness::start().await;
    h.say("Река").await.unwrap();
    h.say("Гора").await.unwrap();
    h.click(&option_data(0)).await.unwrap();
    let kb = h
        .transport
        .sent_to(AUTHOR)
        .into_iter()
        .rev()
        .find_map(|s| s.msg.inline_keyboard().cloned())
        .unwrap();
    assert_eq!(kb.find(&option_data(4)).map(|b| b.text.as_str()), Some("✅ Река"));

    for _ in 0..6 {
        h.click(&nav_data(Nav::Next)).await.unwrap();
    }
    h.say("Море").await.unwrap();
    h.click(&nav_data(Nav::Done)).await.unwrap();
    assert_eq!(h.ended.recv().await, Some(HookEnded::Done));
    assert_eq!(
        h.session.config().unwrap().categories,
        vec!["Город", "Река", "Гора"]
    );
}

#[tokio::test(start_paused = true)]
async fn expiry_warns_timeout_and_tells_author() {
    let mut h = Harness::start_with(Duration::from_secs(60)).await;
    assert_eq!(h.ended.recv().await, Some(HookEnded::Warn(WarnReason::Timeout)));
    assert!(h.transport.saw(AUTHOR, ui::BUILDING_EXPIRED));
    assert!(h.session.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn shutdown_warns_without_messages() {
    let mut h = Harness::start().await;
    let before = h.transport.sent().len();
    h.parent.cancel();
    assert_eq!(h.ended.recv().await, Some(HookEnded::Warn(WarnReason::Shutdown)));
    assert_eq!(h.transport.sent().len(), before);

    let late = h.say("Река").await;
    assert!(late.is_ok());
    assert_eq!(h.transport.sent().len(), before);
}

#[tokio::test(start_paused = true)]
async fn run_is_idempotent() {
    let h = Harness::start().await;
    Arc::clone(&h.session).run().await;
    h.session.stop();
    h.handle.await.unwrap();
}
