use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, Response, StatusCode},
    routing::{get, post},
    Router,
};
use clap::Parser;
use config::Config;
use cooldown::{Clock, CooldownGate, FileStore, SystemClock};
use game::{handlers, CooldownStatus, GameHandle};
use stats::{HttpStatsSource, StatsBoard};
use telegram::TelegramBot;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cards;
mod config;
mod cooldown;
mod game;
mod session;
mod stats;
mod telegram;

#[derive(serde::Serialize)]
struct Resp {
    message: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cooldown: Option<CooldownStatus>,
}

impl Resp {
    fn json<T: serde::Serialize>(body: &T, status: StatusCode) -> Response<String> {
        match serde_json::ser::to_string(body) {
            Ok(body) => {
                let mut resp = Response::new(body);
                *resp.status_mut() = status;
                resp.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                resp
            }
            Err(e) => {
                let mut resp = Response::new(format!("Failed to JSON encode response: {e}"));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                resp
            }
        }
    }

    fn axum<S: ToString>(message: S, status: StatusCode) -> Response<String> {
        Self::json(
            &Self {
                message: message.to_string(),
                success: status == StatusCode::OK,
                cooldown: None,
            },
            status,
        )
    }

    fn ok<T: serde::Serialize>(body: &T) -> Response<String> {
        Self::json(body, StatusCode::OK)
    }

    fn e409<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::CONFLICT)
    }

    fn e429<S: ToString>(message: S, cooldown: CooldownStatus) -> Response<String> {
        Self::json(
            &Self {
                message: message.to_string(),
                success: false,
                cooldown: Some(cooldown),
            },
            StatusCode::TOO_MANY_REQUESTS,
        )
    }

    fn e503<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[derive(Clone)]
struct AppState {
    game: GameHandle,
    stats: watch::Receiver<StatsBoard>,
    telegram: Option<Arc<TelegramBot>>,
}

async fn stats_handler(State(state): State<AppState>) -> Response<String> {
    let board = state.stats.borrow().clone();
    Resp::ok(&board)
}

/// Webhook replies use the bot platform's `{ok}` / `{error}` shape rather
/// than `Resp`.
async fn telegram_handler(State(state): State<AppState>, body: Bytes) -> Response<String> {
    let Some(bot) = state.telegram else {
        return Resp::json(
            &serde_json::json!({ "error": "Bot token not configured" }),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    };

    let result = match serde_json::from_slice(&body) {
        Ok(update) => bot.handle_update(update).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match result {
        Ok(()) => Resp::ok(&serde_json::json!({ "ok": true })),
        Err(e) => {
            tracing::warn!("Webhook update failed: {e}");
            Resp::json(
                &serde_json::json!({ "error": e }),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

fn router(state: AppState, content: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .fallback_service(ServeDir::new(content).append_index_html_on_directories(true))
        .route("/ws/cooldown", get(handlers::cooldown_ws))
        .route("/api/draw", post(handlers::draw))
        .route("/api/balance", get(handlers::balance))
        .route("/api/inventory", get(handlers::inventory))
        .route("/api/leaderboard", get(handlers::leaderboard_handler))
        .route("/api/profile", get(handlers::profile))
        .route("/api/cooldown", get(handlers::cooldown))
        .route("/api/stats", get(stats_handler))
        .route("/api/telegram", post(telegram_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::debug!("Shutting down.");
}

#[tokio::main]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = config.validate() {
        panic!("Invalid configuration: {e}");
    }

    let store = match FileStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(e) => panic!("Failed to open local store: {e}"),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gate = CooldownGate::load(config.cooldown(), Box::new(store), clock.clone());
    tracing::debug!("Cooldown between draws is {:?}.", gate.delay());
    let (game, game_task) = game::spawn(gate, config.reveal_delay());

    let (stats, poller) = stats::spawn_poller(
        HttpStatsSource::new(&config.stats_url),
        config.stats_interval(),
        clock,
    );

    let telegram = match config.telegram_token.clone() {
        Some(token) => Some(Arc::new(TelegramBot::new(token, config.web_app_url.clone()))),
        None => {
            tracing::debug!("No bot token configured, webhook disabled.");
            None
        }
    };

    let app = router(
        AppState {
            game,
            stats,
            telegram,
        },
        &config.static_dir,
    );

    let listener = TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .unwrap_or_else(|e| panic!("Failed to open port {}: {e}", config.port));
    tracing::debug!("Listening on {}:{}.", config.bind, config.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Closed due to error: {e}");
    }

    poller.abort();
    game_task.abort();
}
