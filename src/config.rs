use std::net::SocketAddr;

use crate::Error;

pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const TARGET_CHAT_ID_VAR: &str = "TELEGRAM_TARGET_CHAT_ID";
pub const API_BASE_VAR: &str = "TELEGRAM_API_BASE";
pub const BIND_ADDR_VAR: &str = "RELAY_BIND_ADDR";
pub const MAX_BODY_BYTES_VAR: &str = "RELAY_MAX_BODY_BYTES";
pub const ORDER_TITLE_VAR: &str = "RELAY_ORDER_TITLE";
pub const PAYMENT_NOTE_VAR: &str = "RELAY_PAYMENT_NOTE";

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;
pub const DEFAULT_ORDER_TITLE: &str = "New Order";

/// Everything the relay needs from its environment, validated once at startup.
#[derive(Clone)]
pub struct RelayConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
    pub order_title: String,
    pub payment_note: Option<String>,
}

impl RelayConfig {
    pub fn new<T: Into<String>, C: Into<String>>(bot_token: T, chat_id: C) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            order_title: DEFAULT_ORDER_TITLE.to_string(),
            payment_note: None,
        }
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get(BOT_TOKEN_VAR).ok_or_else(|| Error::config(BOT_TOKEN_VAR))?;
        let chat_id = get(TARGET_CHAT_ID_VAR).ok_or_else(|| Error::config(TARGET_CHAT_ID_VAR))?;

        let bind_addr = get(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::config(format!("{}: {}", BIND_ADDR_VAR, e)))?;

        let max_body_bytes = match get(MAX_BODY_BYTES_VAR) {
            Some(v) => v
                .parse::<usize>()
                .map_err(|e| Error::config(format!("{}: {}", MAX_BODY_BYTES_VAR, e)))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let api_base = get(API_BASE_VAR)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bot_token,
            chat_id,
            api_base,
            bind_addr,
            max_body_bytes,
            order_title: get(ORDER_TITLE_VAR).unwrap_or_else(|| DEFAULT_ORDER_TITLE.to_string()),
            payment_note: get(PAYMENT_NOTE_VAR),
        })
    }

    /// URL of a bot API method, e.g. `sendMessage`.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }
}

// The token is a secret, keep it out of logs.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("bind_addr", &self.bind_addr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("order_title", &self.order_title)
            .field("payment_note", &self.payment_note)
            .finish()
    }
}
