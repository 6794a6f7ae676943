//! Telegram update handlers.
//!
//! Handlers pull what they need out of the teloxide `Message`, hand plain
//! values to `commands`, and send back whatever reply comes out.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use rvw_core::{
    domain::{ChatId, Recipient, UserId},
    messaging::types::DeliveryOptions,
};

use crate::router::AppState;

pub mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let user = msg.from();
    let user_id = user.map(|u| UserId(u.id.0 as i64));
    let label = user.map(|u| match &u.username {
        Some(name) => format!("@{name}"),
        None => u.first_name.clone(),
    });
    let chat = Recipient { id: chat_id, label };

    let reply = if text.starts_with('/') {
        commands::handle_command(&state, chat, user_id, text).await
    } else {
        commands::help_text()
    };

    if let Err(e) = state
        .messenger
        .deliver(chat_id, &reply, &DeliveryOptions::html().without_link_preview())
        .await
    {
        tracing::warn!(chat_id = chat_id.0, "failed to send reply: {e}");
    }

    Ok(())
}
