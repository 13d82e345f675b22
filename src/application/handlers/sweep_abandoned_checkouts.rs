//! SweepAbandonedCheckoutsHandler - periodic cleanup of stale checkouts.
//!
//! A Pending row holds a program slot while the client sits on the gateway's
//! checkout page. Sessions that never complete would hold those slots forever,
//! so a scheduled sweep cancels rows older than the configured window and
//! returns their slots. The same run purges webhook dedupe records past their
//! retention.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::BillingConfig;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{ProgramStore, SubscriptionStore, WebhookEventStore};

/// What one sweep run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Pending subscriptions canceled as abandoned.
    pub swept: u32,
    /// Program slots returned.
    pub slots_released: u32,
    /// Webhook dedupe records purged past retention.
    pub events_purged: u64,
}

/// Handler for the abandoned-checkout sweep.
pub struct SweepAbandonedCheckoutsHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    programs: Arc<dyn ProgramStore>,
    events: Arc<dyn WebhookEventStore>,
    billing: BillingConfig,
}

impl SweepAbandonedCheckoutsHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        programs: Arc<dyn ProgramStore>,
        events: Arc<dyn WebhookEventStore>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            subscriptions,
            programs,
            events,
            billing,
        }
    }

    /// Runs one sweep pass. Safe to re-run on any schedule: a row is only
    /// swept while still Pending, and its slot is only released once.
    ///
    /// Failures on individual rows are logged and skipped; the run keeps
    /// going so one bad row cannot wedge the whole sweep.
    pub async fn handle(&self) -> Result<SweepReport, DomainError> {
        let cutoff = Timestamp::now().minus_secs(self.billing.abandoned_after_hours as i64 * 3600);
        let stale = self.subscriptions.find_pending_created_before(cutoff).await?;

        let mut report = SweepReport::default();
        for mut subscription in stale {
            match subscription.cancel() {
                Ok(true) => {}
                // Lost a race with a deletion event; nothing to do.
                Ok(false) => continue,
                Err(err) => {
                    warn!(subscription_id = %subscription.id, error = %err, "sweep skip");
                    continue;
                }
            }
            let release_slot = subscription.take_slot_release();

            if let Err(err) = self.subscriptions.save(subscription.clone()).await {
                warn!(subscription_id = %subscription.id, error = %err, "sweep save failed");
                continue;
            }
            report.swept += 1;

            if release_slot {
                match self.programs.release_slot(subscription.program_id).await {
                    Ok(()) => report.slots_released += 1,
                    Err(err) => {
                        warn!(
                            program_id = %subscription.program_id,
                            error = %err,
                            "slot release failed; counter is now conservative"
                        );
                    }
                }
            }
        }

        let retention_cutoff =
            Timestamp::now().minus_days(self.billing.event_retention_days as i64);
        report.events_purged = self.events.delete_before(retention_cutoff).await?;

        info!(
            swept = report.swept,
            slots_released = report.slots_released,
            events_purged = report.events_purged,
            "abandonment sweep complete"
        );

        Ok(report)
    }
}
