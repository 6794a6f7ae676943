use std::fmt;

use crate::{broadcast::sender::DeliveryOutcome, domain::ChatId, errors::DeliveryError};

/// Aggregate result of one broadcast.
///
/// `succeeded + failed == total`, and `failures` is sorted by recipient id,
/// so the same set of outcomes always yields an equal report whatever order
/// the sends completed in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<(ChatId, DeliveryError)>,
}

impl BroadcastReport {
    /// Report for a broadcast that found nobody to send to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = DeliveryOutcome>,
    {
        let mut report = Self::default();
        for outcome in outcomes {
            report.total += 1;
            match outcome {
                DeliveryOutcome::Delivered { .. } => report.succeeded += 1,
                DeliveryOutcome::Failed { recipient, error } => {
                    report.failed += 1;
                    report.failures.push((recipient, error));
                }
            }
        }
        report.failures.sort_by(|(a, ea), (b, eb)| {
            a.cmp(b)
                .then_with(|| ea.kind.as_str().cmp(eb.kind.as_str()))
                .then_with(|| ea.detail.cmp(&eb.detail))
        });
        report
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }

    /// Recipients whose failure says they can no longer be reached.
    pub fn blocked_recipients(&self) -> Vec<ChatId> {
        self.failures
            .iter()
            .filter(|(_, e)| e.is_blocked())
            .map(|(id, _)| *id)
            .collect()
    }
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivered {}/{} ({} failed)",
            self.succeeded, self.total, self.failed
        )?;
        for (id, err) in &self.failures {
            write!(f, "\n  {}: {}", id.0, err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageId, MessageRef},
        errors::DeliveryErrorKind,
    };

    fn ok(id: i64) -> DeliveryOutcome {
        DeliveryOutcome::Delivered {
            recipient: ChatId(id),
            receipt: MessageRef {
                chat_id: ChatId(id),
                message_id: MessageId(1),
            },
        }
    }

    fn fail(id: i64, kind: DeliveryErrorKind) -> DeliveryOutcome {
        DeliveryOutcome::Failed {
            recipient: ChatId(id),
            error: DeliveryError::new(kind, format!("err-{id}")),
        }
    }

    #[test]
    fn tallies_outcomes() {
        let report = BroadcastReport::from_outcomes(vec![
            ok(1),
            fail(2, DeliveryErrorKind::Timeout),
            ok(3),
            fail(4, DeliveryErrorKind::Blocked),
        ]);

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded + report.failed, report.total);
        assert!(!report.all_delivered());
        assert_eq!(report.blocked_recipients(), vec![ChatId(4)]);
    }

    #[test]
    fn arrival_order_does_not_change_the_report() {
        let forward = vec![
            fail(30, DeliveryErrorKind::Network),
            ok(10),
            fail(20, DeliveryErrorKind::Rejected),
            fail(5, DeliveryErrorKind::Timeout),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = BroadcastReport::from_outcomes(forward.clone());
        let b = BroadcastReport::from_outcomes(reversed);
        let c = BroadcastReport::from_outcomes(forward);

        assert_eq!(a, b);
        assert_eq!(a, c);
        let ids: Vec<i64> = a.failures.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![5, 20, 30]);
    }

    #[test]
    fn same_recipient_and_detail_sort_by_kind() {
        let timeout = DeliveryOutcome::Failed {
            recipient: ChatId(1),
            error: DeliveryError::new(DeliveryErrorKind::Timeout, "x"),
        };
        let network = DeliveryOutcome::Failed {
            recipient: ChatId(1),
            error: DeliveryError::new(DeliveryErrorKind::Network, "x"),
        };

        let a = BroadcastReport::from_outcomes(vec![timeout.clone(), network.clone()]);
        let b = BroadcastReport::from_outcomes(vec![network, timeout]);

        assert_eq!(a, b);
        assert_eq!(a.failures[0].1.kind, DeliveryErrorKind::Network);
    }

    #[test]
    fn empty_report_has_zero_counts() {
        let report = BroadcastReport::from_outcomes(Vec::new());
        assert_eq!(report, BroadcastReport::empty());
        assert!(report.is_empty());
        assert!(report.all_delivered());
    }

    #[test]
    fn display_lists_failures() {
        let report =
            BroadcastReport::from_outcomes(vec![ok(1), fail(2, DeliveryErrorKind::Timeout)]);
        assert_eq!(
            report.to_string(),
            "delivered 1/2 (1 failed)\n  2: timeout: err-2"
        );
    }
}
