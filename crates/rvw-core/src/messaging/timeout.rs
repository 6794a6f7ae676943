use std::{sync::Arc, time::Duration};

use crate::{
    domain::{ChatId, MessageRef},
    errors::DeliveryError,
    messaging::{port::MessagingPort, types::DeliveryOptions},
    Result,
};

/// MessagingPort decorator that bounds every delivery with a deadline.
///
/// An expired call surfaces as a `Timeout` delivery error for that one
/// recipient; the underlying request future is dropped.
pub struct TimeoutMessenger {
    inner: Arc<dyn MessagingPort>,
    limit: Duration,
}

impl TimeoutMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait::async_trait]
impl MessagingPort for TimeoutMessenger {
    async fn deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &DeliveryOptions,
    ) -> Result<MessageRef> {
        match tokio::time::timeout(self.limit, self.inner.deliver(chat_id, text, options)).await {
            Ok(res) => res,
            Err(_) => Err(DeliveryError::timeout(format!(
                "no response from messenger within {}ms",
                self.limit.as_millis()
            ))
            .into()),
        }
    }
}
