use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    broadcast::BroadcastConfig,
    errors::Error,
    messaging::{throttled::ThrottleConfig, types::DeliveryOptions},
    Result,
};

/// Typed configuration for the bot, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub telegram_admin_users: Vec<i64>,
    pub recipients_file: PathBuf,

    // Broadcast
    pub broadcast_max_in_flight: Option<usize>,
    pub delivery_timeout: Duration,
    pub disable_link_preview: bool,
    /// Deliver broadcasts without a notification sound.
    pub broadcast_silent: bool,
    pub prune_blocked_recipients: bool,

    // Telegram limits
    pub telegram_message_limit: usize,
    pub throttle_global_interval: Duration,
    pub throttle_per_chat_interval: Duration,
}

impl Config {
    /// Load from the process environment, after merging `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let telegram_admin_users = parse_csv_i64(get("TELEGRAM_ADMIN_USERS"));
        if telegram_admin_users.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ADMIN_USERS environment variable is required".to_string(),
            ));
        }

        let recipients_file = get("RECIPIENTS_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp/review-bot-recipients.json"));

        let broadcast_max_in_flight = match get("BROADCAST_MAX_IN_FLIGHT").and_then(non_empty) {
            None => None,
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!(
                    "BROADCAST_MAX_IN_FLIGHT must be a positive integer, got {raw:?}"
                ))
            })?),
        };
        if broadcast_max_in_flight == Some(0) {
            return Err(Error::Config(
                "BROADCAST_MAX_IN_FLIGHT must be at least 1".to_string(),
            ));
        }

        let delivery_timeout =
            Duration::from_millis(parse_u64(get("DELIVERY_TIMEOUT_MS")).unwrap_or(15_000));
        let disable_link_preview = parse_bool(get("DISABLE_LINK_PREVIEW")).unwrap_or(false);
        let broadcast_silent = parse_bool(get("BROADCAST_SILENT")).unwrap_or(false);
        let prune_blocked_recipients =
            parse_bool(get("PRUNE_BLOCKED_RECIPIENTS")).unwrap_or(true);

        let telegram_message_limit = parse_usize(get("TELEGRAM_MESSAGE_LIMIT")).unwrap_or(4096);
        let defaults = ThrottleConfig::default();
        let throttle_global_interval = parse_u64(get("THROTTLE_GLOBAL_MS"))
            .map(Duration::from_millis)
            .unwrap_or(defaults.global_min_interval);
        let throttle_per_chat_interval = parse_u64(get("THROTTLE_PER_CHAT_MS"))
            .map(Duration::from_millis)
            .unwrap_or(defaults.per_chat_min_interval);

        Ok(Self {
            telegram_bot_token,
            telegram_admin_users,
            recipients_file,
            broadcast_max_in_flight,
            delivery_timeout,
            disable_link_preview,
            broadcast_silent,
            prune_blocked_recipients,
            telegram_message_limit,
            throttle_global_interval,
            throttle_per_chat_interval,
        })
    }

    pub fn broadcast(&self) -> BroadcastConfig {
        BroadcastConfig {
            max_in_flight: self.broadcast_max_in_flight,
        }
    }

    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            global_min_interval: self.throttle_global_interval,
            per_chat_min_interval: self.throttle_per_chat_interval,
        }
    }

    /// Default options for admin broadcasts.
    pub fn delivery_options(&self) -> DeliveryOptions {
        let options = DeliveryOptions {
            disable_link_preview: self.disable_link_preview,
            ..DeliveryOptions::html()
        };
        if self.broadcast_silent {
            options.silent()
        } else {
            options
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_usize(v: Option<String>) -> Option<usize> {
    v.and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
