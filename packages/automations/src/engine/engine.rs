//! Engine facade: the two entry points the rest of the system calls.
//!
//! `handle_event` is the synchronous path (event in, enrollments advanced as
//! far as their first wait). `sweep_due` is the recurring path that resumes
//! parked runs; any number of workers may sweep concurrently.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::dispatcher::TriggerDispatcher;
use super::enrollment::{EnrollOutcome, EnrollmentManager};
use super::event::AutomationEvent;
use super::scheduler::{AdvanceOutcome, StepScheduler};
use crate::common::{AutomationId, RunId};
use crate::domains::automations::Run;
use crate::kernel::EngineKernel;

/// Per-automation result of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEnrollment {
    /// A run was created and advanced to `outcome`
    Started {
        run_id: RunId,
        outcome: AdvanceOutcome,
    },
    /// Re-enrollment disabled and a non-terminal run already exists
    AlreadyEnrolled,
    /// The automation went inactive between dispatch and enrollment
    Blocked,
}

pub struct AutomationEngine {
    kernel: Arc<EngineKernel>,
    dispatcher: TriggerDispatcher,
    enrollment: EnrollmentManager,
    scheduler: StepScheduler,
    worker_id: String,
}

impl AutomationEngine {
    pub fn new(kernel: Arc<EngineKernel>) -> Self {
        Self::with_worker_id(kernel, format!("worker-{}", Uuid::new_v4()))
    }

    pub fn with_worker_id(kernel: Arc<EngineKernel>, worker_id: impl Into<String>) -> Self {
        let worker_id = worker_id.into();
        Self {
            dispatcher: TriggerDispatcher::new(kernel.clone()),
            enrollment: EnrollmentManager::new(kernel.clone()),
            scheduler: StepScheduler::new(kernel.clone()),
            kernel,
            worker_id,
        }
    }

    pub fn kernel(&self) -> &Arc<EngineKernel> {
        &self.kernel
    }

    /// Handle one inbound domain event end to end: dispatch, enroll, and
    /// advance each new run until it completes, parks, or halts.
    pub async fn handle_event(
        &self,
        event: &AutomationEvent,
    ) -> Result<Vec<(AutomationId, EventEnrollment)>> {
        let candidates = self.dispatcher.dispatch(event).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let automation_id = candidate.automation.id;
            let enrollment = self
                .enrollment
                .enroll(&candidate.automation, event, &self.worker_id)
                .await?;

            let result = match enrollment {
                EnrollOutcome::Enrolled(run) => {
                    let run_id = run.id;
                    let outcome = self.scheduler.advance(run).await?;
                    EventEnrollment::Started { run_id, outcome }
                }
                EnrollOutcome::AlreadyEnrolled => EventEnrollment::AlreadyEnrolled,
                EnrollOutcome::Blocked => EventEnrollment::Blocked,
            };
            results.push((automation_id, result));
        }

        Ok(results)
    }

    /// One sweep pass: claim up to `limit` due runs and advance each.
    ///
    /// Returns how many runs were advanced. An infrastructure error aborts
    /// the batch; claimed runs are recovered via lease expiry and the sweep
    /// is idempotent, so the next cycle picks up where this one stopped.
    pub async fn sweep_due(&self, limit: i64) -> Result<usize> {
        let runs = Run::claim_due(limit, &self.worker_id, &self.kernel.db_pool).await?;
        if runs.is_empty() {
            return Ok(0);
        }

        debug!(count = runs.len(), worker_id = %self.worker_id, "claimed due runs");

        let mut advanced = 0;
        for run in runs {
            self.scheduler.advance(run).await?;
            advanced += 1;
        }

        Ok(advanced)
    }
}
