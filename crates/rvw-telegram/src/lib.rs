//! Telegram adapter (teloxide).
//!
//! This crate implements the `rvw-core` MessagingPort over Telegram Bot API
//! and hosts the command dispatcher.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode as TgParseMode, ApiError, RequestError};

pub mod handlers;
pub mod router;

use rvw_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::{DeliveryError, DeliveryErrorKind},
    messaging::{
        port::MessagingPort,
        types::{DeliveryOptions, ParseMode},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_parse_mode(mode: ParseMode) -> Option<TgParseMode> {
        match mode {
            ParseMode::Plain => None,
            ParseMode::Html => Some(TgParseMode::Html),
            ParseMode::MarkdownV2 => Some(TgParseMode::MarkdownV2),
        }
    }
}

/// Classify a Bot API failure for the broadcast report.
pub fn classify_request_error(e: &RequestError) -> DeliveryErrorKind {
    match e {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::UserDeactivated
            | ApiError::ChatNotFound
            | ApiError::CantInitiateConversation
            | ApiError::CantTalkWithBots,
        ) => DeliveryErrorKind::Blocked,
        RequestError::Api(_) | RequestError::MigrateToChatId(_) => DeliveryErrorKind::Rejected,
        RequestError::RetryAfter(secs) => DeliveryErrorKind::RateLimited {
            retry_after: Some(*secs),
        },
        RequestError::Network(err) if err.is_timeout() => DeliveryErrorKind::Timeout,
        RequestError::Network(_) => DeliveryErrorKind::Network,
        _ => DeliveryErrorKind::Other,
    }
}

fn map_err(e: RequestError) -> rvw_core::Error {
    DeliveryError::new(classify_request_error(&e), format!("telegram error: {e}")).into()
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    /// One `sendMessage` call. 429s are reported, not retried: retry policy
    /// belongs to whoever wraps the broadcast.
    async fn deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &DeliveryOptions,
    ) -> Result<MessageRef> {
        let mut req = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .disable_web_page_preview(options.disable_link_preview)
            .disable_notification(options.disable_notification);
        if let Some(mode) = Self::tg_parse_mode(options.parse_mode) {
            req = req.parse_mode(mode);
        }

        let msg = req.await.map_err(map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}
