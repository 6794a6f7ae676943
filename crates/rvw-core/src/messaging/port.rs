use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::DeliveryOptions,
    Result,
};

/// Outbound messenger port.
///
/// `deliver` is a single-recipient primitive: exactly one attempt, no retries.
/// Implementations must be safe for many concurrent in-flight calls, since a
/// broadcast shares one instance across all of its sends.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &DeliveryOptions,
    ) -> Result<MessageRef>;
}
