use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocketUpgrade},
        State,
    },
    http::Response,
};
use futures_util::{Sink, SinkExt};

use crate::{
    cards::Card,
    cooldown::format_remaining,
    session::{leaderboard, Session},
    AppState, Resp,
};

use super::{CooldownStatus, DrawOutcome, GameHandle, Toast};

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(serde::Serialize)]
struct DrawResponse {
    card: Card,
    balance: u64,
    toast: Toast,
}

fn unavailable() -> Response<String> {
    Resp::e503("Game server unavailable.")
}

pub async fn draw(State(state): State<AppState>) -> Response<String> {
    match state.game.draw().await {
        Some(DrawOutcome::Drawn {
            card,
            balance,
            toast,
        }) => Resp::ok(&DrawResponse {
            card,
            balance,
            toast,
        }),
        Some(DrawOutcome::TooEarly { remaining }) => Resp::e429(
            format!("Следующая карточка через {}", format_remaining(remaining)),
            CooldownStatus::new(remaining),
        ),
        Some(DrawOutcome::Busy) => Resp::e409("Карточка уже открывается"),
        None => unavailable(),
    }
}

pub async fn balance(State(state): State<AppState>) -> Response<String> {
    match state.game.view(Session::summary).await {
        Some(summary) => Resp::ok(&summary),
        None => unavailable(),
    }
}

pub async fn inventory(State(state): State<AppState>) -> Response<String> {
    match state.game.view(Session::groups).await {
        Some(groups) => Resp::ok(&groups),
        None => unavailable(),
    }
}

pub async fn leaderboard_handler(State(state): State<AppState>) -> Response<String> {
    match state.game.view(|s| leaderboard(s.balance())).await {
        Some(standings) => Resp::ok(&standings),
        None => unavailable(),
    }
}

pub async fn profile(State(state): State<AppState>) -> Response<String> {
    match state.game.view(Session::profile).await {
        Some(profile) => Resp::ok(&profile),
        None => unavailable(),
    }
}

pub async fn cooldown(State(state): State<AppState>) -> Response<String> {
    match state.game.cooldown().await {
        Some(status) => Resp::ok(&status),
        None => unavailable(),
    }
}

pub async fn cooldown_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| countdown(socket, state.game))
}

/// Push the cooldown to the client once a second until it is ready. Ends
/// early, dropping the timer, when the client goes away.
async fn countdown<S>(mut socket: S, game: GameHandle)
where
    S: Sink<Message> + Unpin,
{
    let mut ticker = tokio::time::interval(COUNTDOWN_TICK);
    loop {
        ticker.tick().await;

        let Some(status) = game.cooldown().await else {
            break;
        };
        let body = match serde_json::to_string(&status) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to encode cooldown status: {e}");
                break;
            }
        };
        if socket.send(Message::Text(body)).await.is_err() {
            tracing::debug!("Countdown client disconnected.");
            return;
        }
        if status.ready {
            break;
        }
    }
    socket.send(Message::Close(None)).await.ok();
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use axum::extract::ws::Message;

    use crate::{
        cooldown::{Clock, CooldownGate, MemoryStore},
        game::{self, DrawOutcome},
    };

    use super::countdown;

    /// Epoch millis that follow tokio's clock, so paused time drives the gate.
    struct TokioClock(tokio::time::Instant);

    impl Clock for TokioClock {
        fn now_millis(&self) -> i64 {
            game::test::START + self.0.elapsed().as_millis() as i64
        }
    }

    fn status(frame: &Message) -> serde_json::Value {
        match frame {
            Message::Text(body) => serde_json::from_str(body).unwrap(),
            other => panic!("expected a status frame, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_until_ready() {
        let clock = Arc::new(TokioClock(tokio::time::Instant::now()));
        let gate = CooldownGate::load(
            Duration::from_secs(4),
            Box::new(MemoryStore::default()),
            clock,
        );
        let (game, _task) = game::spawn(gate, game::test::REVEAL);

        // Armed at the draw, so three seconds remain once the card is revealed.
        assert!(matches!(game.draw().await, Some(DrawOutcome::Drawn { .. })));

        let started = tokio::time::Instant::now();
        let mut frames: Vec<Message> = Vec::new();
        countdown(&mut frames, game).await;
        assert_eq!(started.elapsed(), Duration::from_secs(3));

        let (close, statuses) = frames.split_last().unwrap();
        assert!(matches!(close, Message::Close(None)));

        let statuses: Vec<_> = statuses.iter().map(status).collect();
        let remaining: Vec<_> = statuses
            .iter()
            .map(|s| s["remaining_ms"].as_u64())
            .collect();
        assert_eq!(remaining, [Some(3000), Some(2000), Some(1000), Some(0)]);
        let (last, waiting) = statuses.split_last().unwrap();
        assert!(waiting.iter().all(|s| s["ready"] == false));
        assert_eq!(waiting[0]["display"], "0:03");
        assert_eq!(last["ready"], true);
        assert_eq!(last["display"], "0:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_when_already_ready() {
        let clock = Arc::new(TokioClock(tokio::time::Instant::now()));
        let gate = CooldownGate::load(
            Duration::from_secs(4),
            Box::new(MemoryStore::default()),
            clock,
        );
        let (game, _task) = game::spawn(gate, game::test::REVEAL);

        let mut frames: Vec<Message> = Vec::new();
        countdown(&mut frames, game).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(status(&frames[0])["ready"], true);
        assert!(matches!(frames[1], Message::Close(None)));
    }
}
