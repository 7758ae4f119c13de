//! Chat-bot webhook. The bot's only job is to answer `/start` with a button
//! that opens the game.

const API_BASE: &str = "https://api.telegram.org";

const WELCOME: &str = "🐱 Добро пожаловать в КотоКоллекцию!\n\n\
    Собирай редких котиков, зарабатывай очки и соревнуйся с друзьями!";

const PLAY_BUTTON: &str = "🎮 Играть";

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("telegram returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(serde::Deserialize)]
pub struct Update {
    message: Option<IncomingMessage>,
}

#[derive(serde::Deserialize)]
struct IncomingMessage {
    chat: Chat,
    text: Option<String>,
}

#[derive(serde::Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, serde::Serialize)]
struct WebApp {
    url: String,
}

#[derive(Debug, serde::Serialize)]
struct InlineButton {
    text: &'static str,
    web_app: WebApp,
}

#[derive(Debug, serde::Serialize)]
struct ReplyMarkup {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Debug, serde::Serialize)]
struct SendMessage {
    chat_id: i64,
    text: &'static str,
    reply_markup: ReplyMarkup,
}

impl SendMessage {
    fn welcome(chat_id: i64, web_app_url: &str) -> Self {
        Self {
            chat_id,
            text: WELCOME,
            reply_markup: ReplyMarkup {
                inline_keyboard: vec![vec![InlineButton {
                    text: PLAY_BUTTON,
                    web_app: WebApp {
                        url: web_app_url.to_string(),
                    },
                }]],
            },
        }
    }
}

pub struct TelegramBot {
    client: reqwest::Client,
    token: String,
    web_app_url: String,
    api_base: String,
}

impl TelegramBot {
    pub fn new(token: String, web_app_url: String) -> Self {
        Self::with_api_base(token, web_app_url, API_BASE.to_string())
    }

    fn with_api_base(token: String, web_app_url: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            web_app_url,
            api_base,
        }
    }

    /// Act on a webhook update. Anything other than `/start` is ignored.
    pub async fn handle_update(&self, update: Update) -> Result<(), TelegramError> {
        let Some(message) = update.message else {
            return Ok(());
        };
        if message.text.as_deref() != Some("/start") {
            return Ok(());
        }

        tracing::debug!("Sending welcome to chat {}.", message.chat.id);
        // The request URL carries the token, so it must not reach error text.
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let resp = self
            .client
            .post(url)
            .json(&SendMessage::welcome(message.chat.id, &self.web_app_url))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        if !resp.status().is_success() {
            return Err(TelegramError::Status(resp.status()));
        }
        Ok(())
    }
}
