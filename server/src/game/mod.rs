use std::time::Duration;

use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender},
        oneshot,
    },
    task::JoinHandle,
};

use crate::{
    cards::{draw::draw_card, Card},
    cooldown::{format_remaining, CooldownGate},
    session::Session,
};

pub mod handlers;

#[derive(Clone, Debug, serde::Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
}

impl Toast {
    fn for_card(card: &Card) -> Self {
        Self {
            title: format!(
                "Получен {} котик! +{} очков",
                card.rarity.config().label,
                card.points
            ),
            description: format!("{} {}", card.emoji(), card.name()),
        }
    }
}

#[derive(Debug)]
pub enum DrawOutcome {
    Drawn {
        card: Card,
        balance: u64,
        toast: Toast,
    },
    /// Rejected, the cooldown has not yet elapsed.
    TooEarly { remaining: Duration },
    /// Rejected, another draw is still being revealed.
    Busy,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CooldownStatus {
    pub ready: bool,
    pub remaining_ms: u64,
    pub display: String,
}

impl CooldownStatus {
    pub fn new(remaining: Duration) -> Self {
        Self {
            ready: remaining.is_zero(),
            remaining_ms: remaining.as_millis() as u64,
            display: format_remaining(remaining),
        }
    }
}

/// Runs on the game task against the live session and sends its own reply.
type SessionView = Box<dyn FnOnce(&Session) + Send>;

enum GameRequest {
    Draw(oneshot::Sender<DrawOutcome>),
    View(SessionView),
    Cooldown(oneshot::Sender<CooldownStatus>),
    Reveal,
}

/// Cheap to clone. All calls return None once the game task has stopped.
#[derive(Clone)]
pub struct GameHandle {
    chan: UnboundedSender<GameRequest>,
}

impl GameHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> GameRequest) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        self.chan.send(make(tx)).ok()?;
        rx.await.ok()
    }

    /// Attempt a draw. Resolves once the card has been revealed and recorded,
    /// or immediately if the draw is rejected.
    pub async fn draw(&self) -> Option<DrawOutcome> {
        self.request(GameRequest::Draw).await
    }

    /// Derive a view of the session on the game task. Only the view crosses
    /// the channel.
    pub async fn view<T, F>(&self, view: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&Session) -> T + Send + 'static,
    {
        self.request(|reply| {
            GameRequest::View(Box::new(move |session: &Session| {
                reply.send(view(session)).ok();
            }))
        })
        .await
    }

    pub async fn cooldown(&self) -> Option<CooldownStatus> {
        self.request(GameRequest::Cooldown).await
    }
}

struct PendingDraw {
    card: Card,
    reply: oneshot::Sender<DrawOutcome>,
}

/// Owns all game state. Requests are handled one at a time on a single task.
struct GameServer {
    gate: CooldownGate,
    session: Session,
    reveal_delay: Duration,

    /// Set while a drawn card waits out the reveal delay. At most one draw is
    /// in flight.
    pending: Option<PendingDraw>,

    chan: UnboundedReceiver<GameRequest>,
    this: WeakUnboundedSender<GameRequest>,
}

impl GameServer {
    async fn run(&mut self) {
        while let Some(req) = self.chan.recv().await {
            match req {
                GameRequest::Draw(reply) => self.handle_draw(reply),
                GameRequest::Reveal => self.handle_reveal(),
                GameRequest::View(view) => view(&self.session),
                GameRequest::Cooldown(reply) => {
                    reply.send(CooldownStatus::new(self.gate.remaining())).ok();
                }
            }
        }
        tracing::debug!("Game server stopped.");
    }

    fn handle_draw(&mut self, reply: oneshot::Sender<DrawOutcome>) {
        if self.pending.is_some() {
            reply.send(DrawOutcome::Busy).ok();
            return;
        }

        if !self.gate.can_draw() {
            let remaining = self.gate.remaining();
            tracing::debug!(
                "Rejected draw, {} of cooldown remaining.",
                format_remaining(remaining)
            );
            reply.send(DrawOutcome::TooEarly { remaining }).ok();
            return;
        }

        let card = draw_card();
        tracing::info!(
            "Drew {} {} ({}) worth {} points.",
            card.rarity.as_str(),
            card.name(),
            card.id(),
            card.points
        );
        if let Err(e) = self.gate.on_successful_draw() {
            tracing::warn!("Failed to persist cooldown deadline: {e}");
        }
        self.pending = Some(PendingDraw { card, reply });

        let this = self.this.clone();
        let delay = self.reveal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(chan) = this.upgrade() {
                chan.send(GameRequest::Reveal).ok();
            }
        });
    }

    fn handle_reveal(&mut self) {
        let Some(PendingDraw { card, reply }) = self.pending.take() else {
            return;
        };

        // Recorded even if the requester has gone away; the cooldown is
        // already running for this card.
        self.session.record(card.clone());
        let toast = Toast::for_card(&card);
        reply
            .send(DrawOutcome::Drawn {
                card,
                balance: self.session.balance(),
                toast,
            })
            .ok();
    }
}

/// Start the game task. It stops once every handle has been dropped.
pub fn spawn(gate: CooldownGate, reveal_delay: Duration) -> (GameHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut server = GameServer {
        gate,
        session: Session::new(),
        reveal_delay,
        pending: None,
        chan: rx,
        this: tx.downgrade(),
    };
    let task = tokio::spawn(async move { server.run().await });
    (GameHandle { chan: tx }, task)
}

#[cfg(test)]
pub mod test {
    use std::{sync::Arc, time::Duration};

    use crate::{
        cooldown::{CooldownGate, KeyValueStore, ManualClock, MemoryStore, DEADLINE_KEY},
        session::Session,
    };

    use super::{spawn, DrawOutcome, GameHandle};

    pub const DELAY: Duration = Duration::from_secs(120);
    pub const REVEAL: Duration = Duration::from_secs(1);
    pub const START: i64 = 1_700_000_000_000;

    pub fn game(store: &MemoryStore, clock: &Arc<ManualClock>) -> GameHandle {
        let gate = CooldownGate::load(DELAY, Box::new(store.clone()), clock.clone());
        spawn(gate, REVEAL).0
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_records_card() {
        let store = MemoryStore::default();
        let clock = Arc::new(ManualClock::new(START));
        let game = game(&store, &clock);

        let started = tokio::time::Instant::now();
        let Some(DrawOutcome::Drawn {
            card,
            balance,
            toast,
        }) = game.draw().await
        else {
            panic!("expected a card");
        };
        assert!(started.elapsed() >= REVEAL);

        let (min, max) = card.rarity.config().points;
        assert!(min <= card.points && card.points <= max);
        assert_eq!(balance, u64::from(card.points));
        assert!(toast.title.contains(&format!("+{}", card.points)));
        assert!(toast.description.contains(card.name()));

        let inventory = game.view(|s| s.inventory().to_vec()).await.unwrap();
        assert_eq!(inventory, [card]);
        assert_eq!(game.view(Session::balance).await, Some(balance));

        let status = game.cooldown().await.unwrap();
        assert!(!status.ready);
        assert_eq!(status.remaining_ms, 120_000);
        assert_eq!(status.display, "2:00");
        assert_eq!(store.get(DEADLINE_KEY).as_deref(), Some("1700000120000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_draw_changes_nothing() {
        let store = MemoryStore::default();
        let clock = Arc::new(ManualClock::new(START));
        let game = game(&store, &clock);

        assert!(matches!(game.draw().await, Some(DrawOutcome::Drawn { .. })));
        let before = game.view(|s| (s.len(), s.balance())).await.unwrap();

        clock.advance(Duration::from_secs(55));
        match game.draw().await {
            Some(DrawOutcome::TooEarly { remaining }) => {
                assert_eq!(remaining, Duration::from_secs(65))
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let after = game.view(|s| (s.len(), s.balance())).await.unwrap();
        assert_eq!(after, before);
        assert_eq!(store.get(DEADLINE_KEY).as_deref(), Some("1700000120000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_draw_in_flight() {
        let clock = Arc::new(ManualClock::new(START));
        let game = game(&MemoryStore::default(), &clock);

        let (a, b) = tokio::join!(game.draw(), game.draw());
        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, DrawOutcome::Drawn { .. }))
                .count(),
            1
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, DrawOutcome::Busy))
                .count(),
            1
        );
        assert_eq!(game.view(Session::len).await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_again_after_cooldown() {
        let clock = Arc::new(ManualClock::new(START));
        let game = game(&MemoryStore::default(), &clock);

        let Some(DrawOutcome::Drawn { card: first, .. }) = game.draw().await else {
            panic!("expected a card");
        };

        clock.advance(DELAY);
        assert!(game.cooldown().await.unwrap().ready);

        let Some(DrawOutcome::Drawn {
            card: second,
            balance,
            ..
        }) = game.draw().await
        else {
            panic!("expected a card");
        };
        assert_eq!(balance, u64::from(first.points) + u64::from(second.points));
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_survives_restart() {
        let store = MemoryStore::default();
        let clock = Arc::new(ManualClock::new(START));

        let first = game(&store, &clock);
        assert!(matches!(first.draw().await, Some(DrawOutcome::Drawn { .. })));
        drop(first);

        clock.advance(Duration::from_secs(90));
        let second = game(&store, &clock);
        assert_eq!(second.view(Session::len).await, Some(0));
        assert!(matches!(
            second.draw().await,
            Some(DrawOutcome::TooEarly { remaining }) if remaining == Duration::from_secs(30)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_views_follow_session() {
        let clock = Arc::new(ManualClock::new(START));
        let game = game(&MemoryStore::default(), &clock);

        let summary = game.view(Session::summary).await.unwrap();
        assert_eq!(summary.total_cards, 0);
        assert!(game.view(Session::groups).await.unwrap().is_empty());

        let Some(DrawOutcome::Drawn { card, .. }) = game.draw().await else {
            panic!("expected a card");
        };

        let summary = game.view(Session::summary).await.unwrap();
        assert_eq!(summary.total_cards, 1);
        assert_eq!(summary.balance, u64::from(card.points));
        let groups = game.view(Session::groups).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 1);
        let profile = game.view(Session::profile).await.unwrap();
        assert_eq!(profile.total_cards, 1);
    }
}
