//! Per-target outcomes and the batch report.

use crate::TransportError;

/// Proof of one successful send: where the payload landed and how big it
/// was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub destination: String,
    pub bytes: usize,
}

/// The outcome of delivering to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { receipt: Receipt, attempts: u32 },
    Failed { error: TransportError, attempts: u32 },
    /// The run was cancelled before this target's first attempt started.
    Cancelled,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// One target's entry in the batch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub target_id: String,
    pub outcome: DeliveryOutcome,
}

/// The aggregated result of one dispatch call: exactly one outcome per
/// target, regardless of how many failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryBatchReport {
    reports: Vec<DeliveryReport>,
}

impl DeliveryBatchReport {
    pub fn new(reports: Vec<DeliveryReport>) -> Self {
        Self { reports }
    }

    pub fn reports(&self) -> &[DeliveryReport] {
        &self.reports
    }

    pub fn report_for(&self, target_id: &str) -> Option<&DeliveryReport> {
        self.reports.iter().find(|r| r.target_id == target_id)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn delivered_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_delivered())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, DeliveryOutcome::Failed { .. }))
            .count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, DeliveryOutcome::Cancelled))
            .count()
    }

    pub fn all_delivered(&self) -> bool {
        self.reports.iter().all(|r| r.outcome.is_delivered())
    }
}
