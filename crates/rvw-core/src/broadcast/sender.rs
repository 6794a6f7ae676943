use crate::{
    domain::{ChatId, MessageRef},
    errors::DeliveryError,
    messaging::{port::MessagingPort, types::DeliveryOptions},
};

/// Result of delivering one broadcast to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        recipient: ChatId,
        receipt: MessageRef,
    },
    Failed {
        recipient: ChatId,
        error: DeliveryError,
    },
}

/// Deliver `text` to a single recipient.
///
/// Never fails: whatever the transport returns is folded into the outcome,
/// so one recipient's error cannot escape into a concurrent fan-out.
/// One attempt only.
pub async fn send_to_one(
    transport: &dyn MessagingPort,
    recipient: ChatId,
    text: &str,
    options: &DeliveryOptions,
) -> DeliveryOutcome {
    match transport.deliver(recipient, text, options).await {
        Ok(receipt) => {
            tracing::debug!(chat_id = recipient.0, "broadcast delivered");
            DeliveryOutcome::Delivered { recipient, receipt }
        }
        Err(e) => {
            let error = DeliveryError::from(e);
            tracing::warn!(
                chat_id = recipient.0,
                kind = error.kind.as_str(),
                "broadcast delivery failed: {}",
                error.detail
            );
            DeliveryOutcome::Failed { recipient, error }
        }
    }
}
