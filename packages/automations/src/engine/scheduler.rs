//! Step scheduler: advances a claimed run through its step sequence.
//!
//! Non-wait steps chain synchronously within one `advance` call; a wait step
//! parks the run as data (`next_run_at`) and exits the call stack entirely —
//! the external sweep resumes it hours or days later, possibly in a different
//! process.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

use super::executor::StepExecutor;
use crate::domains::automations::models::window::resolve_local;
use crate::domains::automations::{Automation, Run, RunStep, RunStepStatus, Step};
use crate::kernel::EngineKernel;

/// What an `advance` call did with the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Completed,
    Waiting(DateTime<Utc>),
    Canceled,
    Failed,
}

pub struct StepScheduler {
    kernel: Arc<EngineKernel>,
    executor: StepExecutor,
}

impl StepScheduler {
    pub fn new(kernel: Arc<EngineKernel>) -> Self {
        let executor = StepExecutor::new(kernel.clone());
        Self { kernel, executor }
    }

    /// Advance a claimed (`running`) run as far as it can go.
    ///
    /// Exit conditions are re-checked at every step boundary, including
    /// between synchronously chained steps, so cancellation is cooperative
    /// with step granularity. Steps with an existing `success` ledger row are
    /// skipped, which makes duplicate sweeps and crash recovery idempotent.
    pub async fn advance(&self, mut run: Run) -> Result<AdvanceOutcome> {
        let pool = &self.kernel.db_pool;
        let tz = run.tz();

        loop {
            // Exit conditions read the live automation definition; steps stay
            // snapshotted on the run
            let automation = Automation::find_by_id(run.automation_id, pool).await?;
            let Some(automation) = automation else {
                warn!(run_id = %run.id, "automation deleted, canceling run");
                run.mark_canceled(pool).await?;
                return Ok(AdvanceOutcome::Canceled);
            };

            let contact = self
                .kernel
                .snapshots
                .contact_snapshot(run.workspace_id, run.contact_id)
                .await?;
            let Some(contact) = contact else {
                // The contact was deleted mid-sequence; record it and stop
                RunStep::record(
                    run.id,
                    run.current_step_index,
                    run.current_step().map(Step::kind).unwrap_or("none"),
                    RunStepStatus::Skipped,
                    "contact no longer exists",
                    pool,
                )
                .await?;
                run.mark_canceled(pool).await?;
                return Ok(AdvanceOutcome::Canceled);
            };

            let listing = match run.listing_id {
                Some(listing_id) => {
                    self.kernel
                        .snapshots
                        .listing_snapshot(run.workspace_id, listing_id)
                        .await?
                }
                None => None,
            };

            if let Some(exit) = &automation.exit_conditions {
                if exit.evaluate(&contact, listing.as_ref()) {
                    info!(run_id = %run.id, "exit conditions matched, canceling run");
                    run.mark_canceled(pool).await?;
                    return Ok(AdvanceOutcome::Canceled);
                }
            }

            let index = run.current_step_index;
            let Some(step) = run.current_step().cloned() else {
                run.mark_completed(pool).await?;
                info!(run_id = %run.id, "run completed");
                return Ok(AdvanceOutcome::Completed);
            };

            // Crash-recovery / duplicate-sweep case: the step already ran
            if RunStep::success_exists(run.id, index, pool).await? {
                run.advance_cursor(pool).await?;
                continue;
            }

            if let Step::Wait { hours } = step {
                let next_run_at = add_wall_clock_hours(Utc::now(), hours, tz);
                // Ledger row, cursor, and parking commit together; an
                // interrupted worker leaves the wait wholly unscheduled for
                // the lease reclaim to redo
                run.schedule_wait(index, &format!("waiting {hours}h"), next_run_at, pool)
                    .await?;
                info!(run_id = %run.id, next_run_at = %next_run_at, "run parked");
                return Ok(AdvanceOutcome::Waiting(next_run_at));
            }

            // Action steps honor the send window: outside it, park until the
            // next opening instead of executing
            if let Some(window) = &run.schedule_window {
                if let Some(open_at) = window.next_open(Utc::now(), tz) {
                    run.park_waiting(open_at, pool).await?;
                    info!(run_id = %run.id, next_run_at = %open_at, "outside send window, run parked");
                    return Ok(AdvanceOutcome::Waiting(open_at));
                }
            }

            let result = self.executor.execute(&run, &step, &contact).await?;

            // The ledger row must be visible before the run transition is
            RunStep::record(run.id, index, step.kind(), result.status, &result.message, pool)
                .await?;

            match result.status {
                RunStepStatus::Success => {
                    run.advance_cursor(pool).await?;
                }
                RunStepStatus::Failed => {
                    warn!(
                        run_id = %run.id,
                        step_index = index,
                        step_type = step.kind(),
                        message = %result.message,
                        "step failed, halting run"
                    );
                    run.mark_failed(pool).await?;
                    return Ok(AdvanceOutcome::Failed);
                }
                RunStepStatus::Skipped => {
                    run.mark_canceled(pool).await?;
                    return Ok(AdvanceOutcome::Canceled);
                }
            }
        }
    }
}

/// Add `hours` of wall-clock time in `tz`.
///
/// "Wall-clock" means a wait that starts at 14:00 local lands at 14:00+h
/// local even across a daylight-saving transition, which is what "text them
/// 24 hours later" means to the workspace that configured it.
pub fn add_wall_clock_hours(now: DateTime<Utc>, hours: i64, tz: Tz) -> DateTime<Utc> {
    let local = now.with_timezone(&tz).naive_local() + Duration::hours(hours);
    match resolve_local(tz, local) {
        Some(resolved) => resolved.with_timezone(&Utc),
        // Unresolvable local time; fall back to absolute duration
        None => now + Duration::hours(hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Timelike};

    fn chicago() -> Tz {
        "America/Chicago".parse().unwrap()
    }

    fn utc_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
        )
    }

    #[test]
    fn plain_addition_without_dst() {
        let now = utc_at(2026, 6, 15, 15, 0); // 10:00 CDT
        let next = add_wall_clock_hours(now, 4, chicago());
        assert_eq!(next, now + Duration::hours(4));
    }

    #[test]
    fn spring_forward_keeps_wall_clock_intent() {
        // 2026-03-08 02:00 CST: clocks jump to 03:00 CDT in Chicago.
        // Start 2026-03-07 20:00 local (02:00 UTC next day), wait 24h:
        // wall-clock target is 2026-03-08 20:00 CDT = 2026-03-09 01:00 UTC,
        // i.e. only 23 absolute hours later.
        let start = utc_at(2026, 3, 8, 2, 0);
        let next = add_wall_clock_hours(start, 24, chicago());
        assert_eq!(next, utc_at(2026, 3, 9, 1, 0));
        assert_eq!(
            next.with_timezone(&chicago()).hour(),
            start.with_timezone(&chicago()).hour()
        );
    }

    #[test]
    fn fall_back_keeps_wall_clock_intent() {
        // 2026-11-01 02:00 CDT: clocks fall back to 01:00 CST in Chicago.
        // Start 2026-10-31 20:00 CDT (01:00 UTC next day), wait 24h:
        // target is 2026-11-01 20:00 CST = 2026-11-02 02:00 UTC,
        // i.e. 25 absolute hours later.
        let start = utc_at(2026, 11, 1, 1, 0);
        let next = add_wall_clock_hours(start, 24, chicago());
        assert_eq!(next, utc_at(2026, 11, 2, 2, 0));
    }

    #[test]
    fn landing_inside_spring_gap_shifts_forward() {
        // 2026-03-08 01:30 CST + 1h would be 02:30 local, which does not
        // exist; the wait resolves to 03:30 CDT instead of failing.
        let start = utc_at(2026, 3, 8, 7, 30); // 01:30 CST
        let next = add_wall_clock_hours(start, 1, chicago());
        let local = next.with_timezone(&chicago());
        assert_eq!(local.hour(), 3);
        assert_eq!(local.minute(), 30);
    }
}
