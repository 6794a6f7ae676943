use std::sync::Arc;

use rvw_core::{
    broadcast::{BroadcastReport, BroadcastRequest},
    domain::{ChatId, Recipient, UserId},
    formatting::{escape_html, MarkdownToHtml},
    security::is_admin,
    utils::{parse_command, truncate_text},
};

use crate::router::AppState;

const REPORT_PREVIEW_CHARS: usize = 3000;

pub fn help_text() -> String {
    [
        "<b>Review digest bot</b>",
        "",
        "/start - subscribe to new issue notifications",
        "/stop - unsubscribe",
        "/help - this message",
    ]
    .join("\n")
}

fn admin_help_text() -> String {
    format!(
        "{}\n\n<b>Admin</b>\n\
         /broadcast &lt;markdown&gt; - notify every subscriber\n\
         /recipients - subscriber count",
        help_text()
    )
}

/// Run one slash command and return the HTML reply for the caller's chat.
pub async fn handle_command(
    state: &AppState,
    chat: Recipient,
    user_id: Option<UserId>,
    text: &str,
) -> String {
    let (cmd, args) = parse_command(text);
    let admin = is_admin(user_id, &state.cfg.telegram_admin_users);

    match cmd.as_str() {
        "start" => subscribe(state, chat).await,
        "stop" => unsubscribe(state, chat.id).await,
        "help" if admin => admin_help_text(),
        "help" => help_text(),
        "broadcast" | "recipients" if !admin => {
            tracing::warn!(user_id = ?user_id.map(|u| u.0), "non-admin tried /{cmd}");
            "This command is only available to the bot admins.".to_string()
        }
        "broadcast" => broadcast(state, args).await,
        "recipients" => {
            let n = state.store.len().await;
            format!("{n} subscribed recipient(s).")
        }
        _ => format!(
            "Unknown command <code>/{}</code>.\n\n{}",
            escape_html(&cmd),
            help_text()
        ),
    }
}

async fn subscribe(state: &AppState, chat: Recipient) -> String {
    let id = chat.id;
    match state.store.register(chat).await {
        Ok(true) => {
            tracing::info!(chat_id = id.0, "recipient subscribed");
            "Subscribed. You will be notified when a new issue is published.".to_string()
        }
        Ok(false) => "You are already subscribed.".to_string(),
        Err(e) => {
            tracing::error!(chat_id = id.0, "failed to register recipient: {e}");
            "Could not subscribe right now, please try again later.".to_string()
        }
    }
}

async fn unsubscribe(state: &AppState, id: ChatId) -> String {
    match state.store.unregister(id).await {
        Ok(true) => {
            tracing::info!(chat_id = id.0, "recipient unsubscribed");
            "Unsubscribed. Send /start to subscribe again.".to_string()
        }
        Ok(false) => "You were not subscribed.".to_string(),
        Err(e) => {
            tracing::error!(chat_id = id.0, "failed to unregister recipient: {e}");
            "Could not unsubscribe right now, please try again later.".to_string()
        }
    }
}

async fn broadcast(state: &AppState, args: String) -> String {
    if args.trim().is_empty() {
        return "Usage: <code>/broadcast &lt;message&gt;</code>".to_string();
    }

    let request = BroadcastRequest::new(args, state.cfg.delivery_options()).with_formatter(
        Arc::new(MarkdownToHtml::with_limit(state.cfg.telegram_message_limit)),
    );

    let report = match state.broadcaster.broadcast(request).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("broadcast aborted: {e}");
            return format!("Broadcast aborted, nothing was sent: {}", escape_html(&e.to_string()));
        }
    };

    let pruned = prune_blocked(state, &report).await;
    render_report(&report, pruned)
}

/// Drop recipients that can no longer be reached, when configured to.
async fn prune_blocked(state: &AppState, report: &BroadcastReport) -> usize {
    if !state.cfg.prune_blocked_recipients {
        return 0;
    }
    let blocked = report.blocked_recipients();
    if blocked.is_empty() {
        return 0;
    }
    match state.store.unregister_all(&blocked).await {
        Ok(n) => {
            tracing::info!(removed = n, "pruned unreachable recipients");
            n
        }
        Err(e) => {
            tracing::error!("failed to prune unreachable recipients: {e}");
            0
        }
    }
}

fn render_report(report: &BroadcastReport, pruned: usize) -> String {
    if report.is_empty() {
        return "No subscribers yet, nothing was sent.".to_string();
    }
    let mut out = format!(
        "<pre>{}</pre>",
        escape_html(&truncate_text(&report.to_string(), REPORT_PREVIEW_CHARS))
    );
    if pruned > 0 {
        out.push_str(&format!("\nRemoved {pruned} unreachable recipient(s)."));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rvw_core::{
        config::Config,
        directory::RecipientDirectory,
        domain::{MessageId, MessageRef},
        errors::{DeliveryError, DeliveryErrorKind},
        messaging::{port::MessagingPort, types::DeliveryOptions},
        store::JsonRecipientStore,
        Result,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<(ChatId, String)>>,
        failures: HashMap<i64, DeliveryErrorKind>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn deliver(
            &self,
            chat_id: ChatId,
            text: &str,
            _options: &DeliveryOptions,
        ) -> Result<MessageRef> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            if let Some(&kind) = self.failures.get(&chat_id.0) {
                return Err(DeliveryError::new(kind, "stubbed").into());
            }
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    fn cfg(prune: bool) -> Config {
        let prune = if prune { "true" } else { "false" };
        Config::from_lookup(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("x".to_string()),
            "TELEGRAM_ADMIN_USERS" => Some("1".to_string()),
            "PRUNE_BLOCKED_RECIPIENTS" => Some(prune.to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn tmp_store(prefix: &str) -> Arc<JsonRecipientStore> {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = PathBuf::from(format!(
            "/tmp/rvw-cmd-{prefix}-{}-{ts}/recipients.json",
            std::process::id()
        ));
        Arc::new(JsonRecipientStore::open(path).unwrap())
    }

    fn state(
        prefix: &str,
        prune: bool,
        messenger: FakeMessenger,
    ) -> (AppState, Arc<FakeMessenger>) {
        let messenger = Arc::new(messenger);
        let st = AppState::new(Arc::new(cfg(prune)), tmp_store(prefix), messenger.clone());
        (st, messenger)
    }

    const ADMIN: Option<UserId> = Some(UserId(1));
    const USER: Option<UserId> = Some(UserId(2));

    #[tokio::test]
    async fn start_and_stop_manage_the_subscription() {
        let (st, _) = state("sub", true, FakeMessenger::default());
        let me = Recipient::with_label(ChatId(10), "@reader");

        let reply = handle_command(&st, me.clone(), USER, "/start").await;
        assert!(reply.starts_with("Subscribed"));
        let reply = handle_command(&st, me.clone(), USER, "/start@review_bot").await;
        assert_eq!(reply, "You are already subscribed.");
        assert_eq!(st.store.all_recipients().await.unwrap(), vec![me.clone()]);

        let reply = handle_command(&st, me.clone(), USER, "/stop").await;
        assert!(reply.starts_with("Unsubscribed"));
        assert!(st.store.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_requires_admin() {
        let (st, messenger) = state("auth", true, FakeMessenger::default());
        st.store.register(Recipient::new(ChatId(10))).await.unwrap();

        let reply = handle_command(&st, Recipient::new(ChatId(20)), USER, "/broadcast hi").await;

        assert!(reply.contains("only available to the bot admins"));
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_formats_once_and_reports() {
        let (st, messenger) = state(
            "report",
            false,
            FakeMessenger {
                failures: HashMap::from([(102, DeliveryErrorKind::Timeout)]),
                ..Default::default()
            },
        );
        for id in [101, 102, 103] {
            st.store.register(Recipient::new(ChatId(id))).await.unwrap();
        }

        let reply =
            handle_command(&st, Recipient::new(ChatId(1)), ADMIN, "/broadcast **New** issue").await;

        assert!(reply.contains("delivered 2/3 (1 failed)"));
        assert!(reply.contains("102: timeout"));
        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(_, text)| text == "<b>New</b> issue"));
    }

    #[tokio::test]
    async fn blocked_recipients_are_pruned_when_enabled() {
        let (st, _) = state(
            "prune",
            true,
            FakeMessenger {
                failures: HashMap::from([(7, DeliveryErrorKind::Blocked)]),
                ..Default::default()
            },
        );
        for id in [7, 8] {
            st.store.register(Recipient::new(ChatId(id))).await.unwrap();
        }

        let reply = handle_command(&st, Recipient::new(ChatId(1)), ADMIN, "/broadcast hello").await;

        assert!(reply.contains("Removed 1 unreachable recipient(s)."));
        assert!(!st.store.contains(ChatId(7)).await);
        assert!(st.store.contains(ChatId(8)).await);
    }

    #[tokio::test]
    async fn empty_broadcast_text_shows_usage() {
        let (st, messenger) = state("usage", true, FakeMessenger::default());
        st.store.register(Recipient::new(ChatId(10))).await.unwrap();

        let reply = handle_command(&st, Recipient::new(ChatId(1)), ADMIN, "/broadcast   ").await;

        assert!(reply.starts_with("Usage:"));
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_broadcast_is_aborted_before_sending() {
        let (st, messenger) = state("oversized", true, FakeMessenger::default());
        st.store.register(Recipient::new(ChatId(10))).await.unwrap();
        let long = format!("/broadcast {}", "a".repeat(5000));

        let reply = handle_command(&st, Recipient::new(ChatId(1)), ADMIN, &long).await;

        assert!(reply.starts_with("Broadcast aborted"));
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recipients_count_for_admins() {
        let (st, _) = state("count", true, FakeMessenger::default());
        st.store.register(Recipient::new(ChatId(10))).await.unwrap();

        let reply = handle_command(&st, Recipient::new(ChatId(1)), ADMIN, "/recipients").await;
        assert_eq!(reply, "1 subscribed recipient(s).");
    }
}
