//! Broadcast fan-out: deliver one message to every registered recipient.
//!
//! The flow is snapshot → format once → concurrent single sends → join →
//! aggregate. Only a failing directory or formatter aborts a broadcast;
//! transport failures are per recipient and land in the [`BroadcastReport`].

pub mod report;
pub mod sender;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::{
    directory::RecipientDirectory,
    formatting::MessageFormatter,
    messaging::{port::MessagingPort, types::DeliveryOptions},
    Error, Result,
};

pub use report::BroadcastReport;
pub use sender::{send_to_one, DeliveryOutcome};

#[derive(Clone, Copy, Debug, Default)]
pub struct BroadcastConfig {
    /// Upper bound on deliveries in flight at once. `None` sends to every
    /// recipient simultaneously.
    pub max_in_flight: Option<usize>,
}

/// One logical broadcast: the raw text, how to format it, how to deliver it.
#[derive(Clone)]
pub struct BroadcastRequest {
    text: String,
    formatter: Option<Arc<dyn MessageFormatter>>,
    options: DeliveryOptions,
}

impl BroadcastRequest {
    pub fn new(text: impl Into<String>, options: DeliveryOptions) -> Self {
        Self {
            text: text.into(),
            formatter: None,
            options,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

impl std::fmt::Debug for BroadcastRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastRequest")
            .field("text", &self.text)
            .field("formatter", &self.formatter.is_some())
            .field("options", &self.options)
            .finish()
    }
}

pub struct Broadcaster {
    directory: Arc<dyn RecipientDirectory>,
    transport: Arc<dyn MessagingPort>,
    cfg: BroadcastConfig,
}

impl Broadcaster {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        transport: Arc<dyn MessagingPort>,
        cfg: BroadcastConfig,
    ) -> Self {
        Self {
            directory,
            transport,
            cfg,
        }
    }

    /// Deliver `request` to every recipient currently in the directory.
    ///
    /// Returns `Err` only when the directory cannot be read or the formatter
    /// fails; in both cases nothing has been sent. Otherwise every recipient
    /// of the snapshot is accounted for in the returned report.
    pub async fn broadcast(&self, request: BroadcastRequest) -> Result<BroadcastReport> {
        let recipients = self.directory.all_recipients().await.map_err(|e| match e {
            Error::Directory(_) => e,
            other => Error::Directory(other.to_string()),
        })?;

        if recipients.is_empty() {
            tracing::warn!("broadcast skipped: no registered recipients");
            return Ok(BroadcastReport::empty());
        }

        let text = match &request.formatter {
            Some(formatter) => formatter.format(&request.text).map_err(|e| match e {
                Error::Formatter(_) => e,
                other => Error::Formatter(other.to_string()),
            })?,
            None => request.text.clone(),
        };

        tracing::info!(
            recipients = recipients.len(),
            max_in_flight = ?self.cfg.max_in_flight,
            "broadcast started"
        );

        let gate = self
            .cfg
            .max_in_flight
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let transport = self.transport.as_ref();
        let text = text.as_str();
        let options = &request.options;

        let sends = recipients.iter().map(|recipient| {
            let gate = gate.clone();
            async move {
                // The semaphore is never closed, so acquire only fails if it
                // were; fall through and send ungated in that case.
                let _permit = match &gate {
                    Some(sem) => sem.clone().acquire_owned().await.ok(),
                    None => None,
                };
                send_to_one(transport, recipient.id, text, options).await
            }
        });
        let outcomes = join_all(sends).await;

        let report = BroadcastReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "broadcast finished"
        );
        Ok(report)
    }
}
