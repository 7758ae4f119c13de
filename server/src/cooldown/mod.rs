use std::{sync::Arc, time::Duration};

pub use clock::{Clock, SystemClock};
pub use store::{FileStore, KeyValueStore, StoreError};

#[cfg(test)]
pub use clock::ManualClock;
#[cfg(test)]
pub use store::MemoryStore;

mod clock;
mod store;

/// Store key holding the deadline as decimal epoch milliseconds.
pub const DEADLINE_KEY: &str = "cooldown_deadline";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownState {
    Ready,
    Cooling { remaining: Duration },
}

/// Enforces a fixed wait between draws. The deadline survives restarts
/// through the store.
pub struct CooldownGate {
    delay: Duration,
    deadline: Option<i64>,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CooldownGate {
    /// Build a gate, resuming any deadline left in the store.
    pub fn load(delay: Duration, mut store: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        let deadline = match store.get(DEADLINE_KEY) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(deadline) if deadline > now => Some(deadline),
                Ok(_) => None,
                Err(_) => {
                    tracing::warn!("Discarding unreadable cooldown deadline: {raw:?}");
                    None
                }
            },
            None => None,
        };

        // Stale or garbage entries are dropped so the next start is clean.
        if deadline.is_none() {
            if let Err(e) = store.remove(DEADLINE_KEY) {
                tracing::warn!("Failed to clear cooldown deadline: {e}");
            }
        }

        let gate = Self {
            delay,
            deadline,
            store,
            clock,
        };
        match gate.state() {
            CooldownState::Ready => tracing::debug!("Cooldown gate starting ready."),
            CooldownState::Cooling { remaining } => tracing::debug!(
                "Cooldown gate resuming with {} remaining.",
                format_remaining(remaining)
            ),
        }
        gate
    }

    pub fn state(&self) -> CooldownState {
        let remaining = self.remaining();
        if remaining.is_zero() {
            CooldownState::Ready
        } else {
            CooldownState::Cooling { remaining }
        }
    }

    pub fn can_draw(&self) -> bool {
        self.state() == CooldownState::Ready
    }

    /// Time left until the next draw, zero when ready.
    pub fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => {
                let now = self.clock.now_millis();
                if deadline > now {
                    Duration::from_millis((deadline - now) as u64)
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        }
    }

    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start a new cooldown from now. The in-memory deadline applies even if
    /// persisting it fails.
    pub fn on_successful_draw(&mut self) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        let next = now + self.delay.as_millis() as i64;
        let deadline = self.deadline.map_or(next, |d| d.max(next));
        self.deadline = Some(deadline);
        self.store.set(DEADLINE_KEY, deadline.to_string())
    }
}

/// Render as minutes:seconds, e.g. `1:05`. Partial seconds round up so a
/// gate only shows `0:00` once it is ready.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_millis().div_ceil(1000);
    format!("{}:{:02}", secs / 60, secs % 60)
}
