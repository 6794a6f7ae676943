use std::sync::Arc;

use rvw_core::{config::Config, store::JsonRecipientStore};

#[tokio::main]
async fn main() -> Result<(), rvw_core::Error> {
    rvw_core::logging::init("rvw")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(JsonRecipientStore::open(&cfg.recipients_file)?);

    rvw_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| rvw_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("bot stopped");
    Ok(())
}
