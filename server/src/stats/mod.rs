use std::{future::Future, sync::Arc, time::Duration};

use bytes::Buf;
use serde::de::DeserializeOwned;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::cooldown::Clock;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("statistics endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed statistics body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub user_id: i64,
    pub username: String,
    pub action: String,

    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Aggregate usage across all players, as reported by the statistics
/// endpoint.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_users: u64,
    pub total_cards: u64,
    pub total_points: u64,
    #[serde(default)]
    pub recent_activity: Vec<Activity>,
}

/// What the statistics screen shows.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatsBoard {
    /// No poll has finished yet.
    #[default]
    Loading,

    /// At least one poll succeeded. `error` holds the failure of the latest
    /// poll, if it failed.
    Ready {
        snapshot: StatsSnapshot,
        error: Option<String>,
        updated_at: i64,
    },

    /// Every poll so far has failed.
    Failed { error: String },
}

impl StatsBoard {
    /// Fold in the result of a poll. A failure never discards a snapshot.
    pub fn apply(&mut self, result: Result<StatsSnapshot, StatsError>, now: i64) {
        *self = match (std::mem::take(self), result) {
            (_, Ok(snapshot)) => StatsBoard::Ready {
                snapshot,
                error: None,
                updated_at: now,
            },
            (
                StatsBoard::Ready {
                    snapshot,
                    updated_at,
                    ..
                },
                Err(e),
            ) => StatsBoard::Ready {
                snapshot,
                error: Some(e.to_string()),
                updated_at,
            },
            (StatsBoard::Loading | StatsBoard::Failed { .. }, Err(e)) => StatsBoard::Failed {
                error: e.to_string(),
            },
        };
    }
}

pub trait StatsSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<StatsSnapshot, StatsError>> + Send;
}

fn decode_json<T: DeserializeOwned>(bytes: bytes::Bytes) -> Result<T, StatsError> {
    Ok(serde_json::de::from_reader(bytes.reader())?)
}

pub struct HttpStatsSource {
    client: reqwest::Client,
    url: String,
}

impl HttpStatsSource {
    /// Requests go to `url` with the statistics flag added to the query.
    pub fn new(url: &str) -> Self {
        let separator = if url.contains('?') { '&' } else { '?' };
        Self {
            client: reqwest::Client::new(),
            url: format!("{url}{separator}stats=true"),
        }
    }

    async fn get_bytes(&self) -> Result<bytes::Bytes, StatsError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(StatsError::Status(resp.status()));
        }
        Ok(resp.bytes().await?)
    }
}

impl StatsSource for HttpStatsSource {
    async fn fetch(&self) -> Result<StatsSnapshot, StatsError> {
        decode_json(self.get_bytes().await?)
    }
}

/// Poll `source` now and then every `interval`, publishing the board. Stops
/// when every receiver is gone. Failed polls are not retried early, and a
/// poll that outlasts the interval fails with `StatsError::Timeout`.
pub fn spawn_poller<S: StatsSource>(
    source: S,
    interval: Duration,
    clock: Arc<dyn Clock>,
) -> (watch::Receiver<StatsBoard>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(StatsBoard::Loading);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let result = match tokio::time::timeout(interval, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(StatsError::Timeout(interval)),
            };
            match &result {
                Ok(snapshot) => tracing::debug!(
                    "Fetched statistics: {} users, {} cards.",
                    snapshot.total_users,
                    snapshot.total_cards
                ),
                Err(e) => tracing::warn!("Failed to fetch statistics: {e}"),
            }
            tx.send_modify(|board| board.apply(result, clock.now_millis()));
        }
        tracing::debug!("Statistics poller stopped.");
    });

    (rx, task)
}
