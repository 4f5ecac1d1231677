//! Enrollment manager: owns the one-non-terminal-run-per-contact invariant.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use super::event::AutomationEvent;
use crate::domains::automations::{Automation, Run};
use crate::kernel::EngineKernel;

/// Outcome of an enrollment attempt. `AlreadyEnrolled` is the expected result
/// of duplicate triggers, not an error.
pub enum EnrollOutcome {
    Enrolled(Run),
    AlreadyEnrolled,
    Blocked,
}

pub struct EnrollmentManager {
    kernel: Arc<EngineKernel>,
}

impl EnrollmentManager {
    pub fn new(kernel: Arc<EngineKernel>) -> Self {
        Self { kernel }
    }

    /// Create a run for the event's contact, or report why not.
    ///
    /// Uniqueness for non-re-enrollable automations is enforced by the
    /// database's partial unique index, so the guarantee holds across worker
    /// processes without application-level locking.
    pub async fn enroll(
        &self,
        automation: &Automation,
        event: &AutomationEvent,
        worker_id: &str,
    ) -> Result<EnrollOutcome> {
        // The automation may have been deactivated between dispatch and now
        let fresh = Automation::find_by_id(automation.id, &self.kernel.db_pool).await?;
        let still_active = fresh.map(|automation| automation.active).unwrap_or(false);
        if !still_active {
            debug!(automation_id = %automation.id, "automation no longer active, blocking enrollment");
            return Ok(EnrollOutcome::Blocked);
        }

        match Run::insert_enrolled(
            automation,
            event.contact_id,
            event.listing_id,
            worker_id,
            &self.kernel.db_pool,
        )
        .await?
        {
            Some(run) => {
                info!(
                    run_id = %run.id,
                    automation_id = %automation.id,
                    contact_id = %event.contact_id,
                    "contact enrolled"
                );
                Ok(EnrollOutcome::Enrolled(run))
            }
            None => {
                debug!(
                    automation_id = %automation.id,
                    contact_id = %event.contact_id,
                    "contact already has an active run"
                );
                Ok(EnrollOutcome::AlreadyEnrolled)
            }
        }
    }
}
