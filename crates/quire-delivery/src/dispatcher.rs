//! The parallel dispatch loop.

use crate::report::{DeliveryBatchReport, DeliveryOutcome, DeliveryReport};
use crate::target::DeliveryTarget;
use crate::{Transport, TransportError, TransportKind};
use log::{debug, info, warn};
use quire_types::Artifact;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Cooperative cancellation for a dispatch call.
///
/// Cancelling lets already-issued attempts finish; targets whose first
/// attempt has not started are skipped and recorded as `Cancelled`, and
/// no further retries are issued for targets mid-flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fans an artifact out to every target in parallel and aggregates the
/// per-target outcomes.
#[derive(Default)]
pub struct Dispatcher {
    transports: HashMap<TransportKind, Arc<dyn Transport>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport for its kind (builder style). Registration is
    /// process-scoped configuration: build the dispatcher once at startup
    /// and pass it down.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(transport.kind(), transport);
        self
    }

    /// Deliver `artifact` to every target, waiting for all of them.
    ///
    /// The call itself never fails: the report enumerates exactly one
    /// outcome per target, in target order.
    pub async fn dispatch(
        &self,
        artifact: &Artifact,
        targets: &[DeliveryTarget],
        cancel: &CancelToken,
    ) -> DeliveryBatchReport {
        info!(
            "[DISPATCH] Delivering '{}' ({} bytes) to {} target(s)",
            artifact.filename(),
            artifact.len(),
            targets.len()
        );
        let mut set: JoinSet<(usize, DeliveryOutcome)> = JoinSet::new();
        for (index, target) in targets.iter().cloned().enumerate() {
            let transport = self.transports.get(&target.transport).cloned();
            let artifact = artifact.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                (index, deliver_one(transport, artifact, target, cancel).await)
            });
        }

        let mut outcomes: Vec<Option<DeliveryOutcome>> = vec![None; targets.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!("[DISPATCH] Delivery task failed to join: {e}"),
            }
        }

        let reports = targets
            .iter()
            .zip(outcomes)
            .map(|(target, outcome)| DeliveryReport {
                target_id: target.id.clone(),
                outcome: outcome.unwrap_or(DeliveryOutcome::Failed {
                    error: TransportError::Permanent("delivery task panicked".into()),
                    attempts: 0,
                }),
            })
            .collect();
        let report = DeliveryBatchReport::new(reports);
        info!(
            "[DISPATCH] Batch finished: {} delivered, {} failed, {} cancelled",
            report.delivered_count(),
            report.failed_count(),
            report.cancelled_count()
        );
        report
    }
}

/// The per-target attempt loop: retries with exponential backoff on
/// transient errors, fails immediately on permanent ones.
async fn deliver_one(
    transport: Option<Arc<dyn Transport>>,
    artifact: Artifact,
    target: DeliveryTarget,
    cancel: CancelToken,
) -> DeliveryOutcome {
    let Some(transport) = transport else {
        return DeliveryOutcome::Failed {
            error: TransportError::Permanent(format!(
                "no transport registered for kind '{}'",
                target.transport
            )),
            attempts: 0,
        };
    };
    if cancel.is_cancelled() {
        debug!("[DISPATCH] Target '{}' skipped: cancelled", target.id);
        return DeliveryOutcome::Cancelled;
    }

    let max_attempts = target.retry.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let send_transport = Arc::clone(&transport);
        let send_artifact = artifact.clone();
        let send_target = target.clone();
        let result = tokio::task::spawn_blocking(move || {
            send_transport.send(&send_artifact, &send_target)
        })
        .await
        .unwrap_or_else(|e| Err(TransportError::Permanent(format!("send panicked: {e}"))));

        match result {
            Ok(receipt) => {
                debug!(
                    "[DISPATCH] Target '{}' delivered to {} on attempt {}",
                    target.id, receipt.destination, attempt
                );
                return DeliveryOutcome::Delivered { receipt, attempts: attempt };
            }
            Err(error) if !error.is_transient() => {
                warn!("[DISPATCH] Target '{}' failed permanently: {error}", target.id);
                return DeliveryOutcome::Failed { error, attempts: attempt };
            }
            Err(error) if attempt == max_attempts => {
                warn!(
                    "[DISPATCH] Target '{}' exhausted {} attempt(s): {error}",
                    target.id, max_attempts
                );
                return DeliveryOutcome::Failed { error, attempts: attempt };
            }
            Err(error) => {
                // A cancel observed between attempts stops retrying; the
                // target was contacted, so this is a failure, not a skip.
                if cancel.is_cancelled() {
                    return DeliveryOutcome::Failed { error, attempts: attempt };
                }
                let delay = with_jitter(target.retry.backoff(attempt));
                debug!(
                    "[DISPATCH] Target '{}' attempt {} failed transiently, retrying in {:?}",
                    target.id, attempt, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    // The loop always returns from its final attempt.
    DeliveryOutcome::Failed {
        error: TransportError::Permanent("retry loop exited without an outcome".into()),
        attempts: max_attempts,
    }
}

/// Add up to 25% random jitter so parallel retries do not synchronize.
fn with_jitter(delay: Duration) -> Duration {
    let jitter_cap = delay.as_millis() as u64 / 4;
    if jitter_cap == 0 {
        return delay;
    }
    let jitter = rand::rng().random_range(0..=jitter_cap);
    delay + Duration::from_millis(jitter)
}
