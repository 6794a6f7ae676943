use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use rvw_core::{
    broadcast::Broadcaster,
    config::Config,
    messaging::{
        port::MessagingPort, throttled::ThrottledMessenger, timeout::TimeoutMessenger,
    },
    store::JsonRecipientStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<JsonRecipientStore>,
    pub messenger: Arc<dyn MessagingPort>,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    /// Wire the broadcast core to `transport` and `store`.
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<JsonRecipientStore>,
        transport: Arc<dyn MessagingPort>,
    ) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(
            store.clone(),
            transport.clone(),
            cfg.broadcast(),
        ));
        Self {
            cfg,
            store,
            messenger: transport,
            broadcaster,
        }
    }
}

/// Build the outbound stack: Telegram, bounded per call, throttled.
///
/// The timeout sits inside the throttle so time spent waiting for a slot
/// does not count against a delivery.
pub fn build_messenger(cfg: &Config, bot: Bot) -> Arc<dyn MessagingPort> {
    let raw: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot));
    let bounded: Arc<dyn MessagingPort> =
        Arc::new(TimeoutMessenger::new(raw, cfg.delivery_timeout));
    Arc::new(ThrottledMessenger::new(bounded, cfg.throttle()))
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<JsonRecipientStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!("review bot started: @{}", me.username()),
        Err(e) => tracing::warn!("get_me failed: {e}"),
    }
    let recipients = store.len().await;
    tracing::info!(
        recipients,
        admins = cfg.telegram_admin_users.len(),
        max_in_flight = ?cfg.broadcast_max_in_flight,
        "bot configured"
    );

    let messenger = build_messenger(&cfg, bot.clone());
    let state = Arc::new(AppState::new(cfg, store, messenger));

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
