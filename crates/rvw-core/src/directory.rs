use async_trait::async_trait;

use crate::{domain::Recipient, Result};

/// Read side of the recipient registry.
///
/// Returns the full set in one call; a broadcast treats the result as an
/// immutable snapshot for its whole lifetime.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn all_recipients(&self) -> Result<Vec<Recipient>>;
}
