use std::{path::PathBuf, time::Duration};

use clap::Parser;

const DEFAULT_STATS_URL: &str =
    "https://functions.poehali.dev/3f74c3d0-1cd6-4b2d-b8c1-d2480fdb67ac";
const DEFAULT_WEB_APP_URL: &str = "https://cat-card-balance-bot.poehali.dev";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Cat card collection game server")]
pub struct Config {
    /// Directory of frontend files to serve
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Directory for the local key-value store
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Seconds between draws
    #[arg(long, default_value = "120")]
    pub cooldown_secs: u64,

    /// Milliseconds a drawn card takes to reveal
    #[arg(long, default_value = "1000")]
    pub reveal_ms: u64,

    /// Aggregate statistics endpoint
    #[arg(long, env = "STATS_URL", default_value = DEFAULT_STATS_URL)]
    pub stats_url: String,

    /// Seconds between statistics polls
    #[arg(long, default_value = "30")]
    pub stats_interval_secs: u64,

    /// Bot token; the webhook answers with an error without one
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_token: Option<String>,

    /// Page the bot's play button opens
    #[arg(long, env = "WEB_APP_URL", default_value = DEFAULT_WEB_APP_URL)]
    pub web_app_url: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cooldown_secs == 0 {
            return Err(ConfigError::Zero("cooldown-secs"));
        }
        if self.stats_interval_secs == 0 {
            return Err(ConfigError::Zero("stats-interval-secs"));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}
