//! Run model: one live execution of an automation against one contact.
//!
//! All correctness-relevant transitions are atomic conditional updates so the
//! invariants hold across any number of worker processes:
//! - enrollment is a single INSERT with a partial-unique-index conflict target
//! - claiming is a CTE UPDATE guarded by FOR UPDATE SKIP LOCKED
//! - every status transition is guarded by the expected current status

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;

use super::automation::Automation;
use super::step::Step;
use super::window::ScheduleWindow;
use crate::common::{AutomationId, ContactId, ListingId, RunId, RunStepId, WorkspaceId};

/// Lease granted to the worker that claims a run. Expired leases make the run
/// claimable again, which is how crashed workers are recovered.
const RUN_LEASE_MS: i64 = 300_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "run_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Waiting,
    Completed,
    Failed,
    Canceled,
}

impl RunStatus {
    /// Terminal runs never advance again and do not block re-enrollment.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Canceled
        )
    }
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub automation_id: AutomationId,
    pub workspace_id: WorkspaceId,
    pub contact_id: ContactId,
    pub listing_id: Option<ListingId>,

    pub status: RunStatus,
    pub current_step_index: i32,

    // Snapshotted from the automation at enrollment; edits to the automation
    // never change what an in-flight run executes
    #[sqlx(json)]
    pub steps: Vec<Step>,
    pub timezone: String,
    #[sqlx(json(nullable))]
    pub schedule_window: Option<ScheduleWindow>,

    /// Denormalized "re-enrollment forbidden" flag backing the partial unique index
    pub single_enrollment: bool,

    pub next_run_at: Option<DateTime<Utc>>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            warn!(run_id = %self.id, timezone = %self.timezone, "invalid timezone, falling back to UTC");
            Tz::UTC
        })
    }

    pub fn current_step(&self) -> Option<&Step> {
        usize::try_from(self.current_step_index)
            .ok()
            .and_then(|index| self.steps.get(index))
    }

    /// Enroll a contact: create a run at step 0, status `running`, claimed by
    /// `worker_id` for immediate progression.
    ///
    /// Returns `None` when re-enrollment is disabled and a non-terminal run
    /// already exists for this (automation, contact) pair — the conflict is
    /// absorbed by the partial unique index, not by a check-then-act read, so
    /// two concurrent events cannot both enroll.
    pub async fn insert_enrolled(
        automation: &Automation,
        contact_id: ContactId,
        listing_id: Option<ListingId>,
        worker_id: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO automation_runs (
                id, automation_id, workspace_id, contact_id, listing_id,
                status, current_step_index, steps, timezone, schedule_window,
                single_enrollment, next_run_at, lease_expires_at, worker_id, started_at
            )
            VALUES (
                $1, $2, $3, $4, $5,
                'running', 0, $6, $7, $8,
                $9, NOW(), NOW() + ($10 || ' milliseconds')::INTERVAL, $11, NOW()
            )
            ON CONFLICT (automation_id, contact_id)
                WHERE single_enrollment AND status IN ('running', 'waiting')
                DO NOTHING
            RETURNING *
            "#,
        )
        .bind(RunId::new())
        .bind(automation.id)
        .bind(automation.workspace_id)
        .bind(contact_id)
        .bind(listing_id)
        .bind(Json(&automation.steps))
        .bind(&automation.timezone)
        .bind(automation.schedule_window.as_ref().map(Json))
        .bind(automation.single_enrollment())
        .bind(RUN_LEASE_MS.to_string())
        .bind(worker_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Claim due runs atomically using FOR UPDATE SKIP LOCKED.
    ///
    /// Picks up waiting runs whose `next_run_at` has elapsed, plus running
    /// runs whose lease expired (worker crashed mid-advance). Only one worker
    /// transitions a given run.
    pub async fn claim_due(limit: i64, worker_id: &str, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            WITH due_runs AS (
                SELECT id
                FROM automation_runs
                WHERE (status = 'waiting' AND next_run_at <= NOW())
                   OR (status = 'running' AND lease_expires_at < NOW())
                ORDER BY next_run_at NULLS FIRST
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE automation_runs
            SET status = 'running',
                next_run_at = NULL,
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                worker_id = $3,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM due_runs)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(RUN_LEASE_MS.to_string())
        .bind(worker_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Move the cursor past the current step. Only valid on a claimed run.
    pub async fn advance_cursor(&mut self, pool: &PgPool) -> Result<()> {
        let index = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE automation_runs
            SET current_step_index = current_step_index + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            RETURNING current_step_index
            "#,
        )
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        self.current_step_index = index;
        Ok(())
    }

    /// Schedule a wait atomically: append the wait's success ledger row, move
    /// the cursor past it, and park the run until `next_run_at`.
    ///
    /// One transaction, so a crash can never leave the cursor past a wait
    /// that was not parked - reclaiming an interrupted run always finds the
    /// wait either wholly unscheduled or wholly scheduled.
    pub async fn schedule_wait(
        &mut self,
        step_index: i32,
        message: &str,
        next_run_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<()> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO automation_run_steps (id, run_id, step_index, step_type, status, message)
            VALUES ($1, $2, $3, 'wait', 'success', $4)
            "#,
        )
        .bind(RunStepId::new())
        .bind(self.id)
        .bind(step_index)
        .bind(message)
        .execute(&mut *tx)
        .await?;

        let index = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE automation_runs
            SET current_step_index = current_step_index + 1,
                status = 'waiting',
                next_run_at = $2,
                lease_expires_at = NULL,
                worker_id = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            RETURNING current_step_index
            "#,
        )
        .bind(self.id)
        .bind(next_run_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.current_step_index = index;
        self.status = RunStatus::Waiting;
        self.next_run_at = Some(next_run_at);
        Ok(())
    }

    /// Park the run until `next_run_at`; a future sweep resumes it.
    pub async fn park_waiting(&mut self, next_run_at: DateTime<Utc>, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE automation_runs
            SET status = 'waiting',
                next_run_at = $2,
                lease_expires_at = NULL,
                worker_id = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(self.id)
        .bind(next_run_at)
        .execute(pool)
        .await?;

        self.status = RunStatus::Waiting;
        self.next_run_at = Some(next_run_at);
        Ok(())
    }

    pub async fn mark_completed(&mut self, pool: &PgPool) -> Result<()> {
        self.finish(RunStatus::Completed, pool).await
    }

    pub async fn mark_failed(&mut self, pool: &PgPool) -> Result<()> {
        self.finish(RunStatus::Failed, pool).await
    }

    pub async fn mark_canceled(&mut self, pool: &PgPool) -> Result<()> {
        self.finish(RunStatus::Canceled, pool).await
    }

    async fn finish(&mut self, status: RunStatus, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE automation_runs
            SET status = $2,
                next_run_at = NULL,
                lease_expires_at = NULL,
                worker_id = NULL,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(self.id)
        .bind(status)
        .execute(pool)
        .await?;

        self.status = status;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Explicit cancellation of any non-terminal run (user action).
    pub async fn cancel(id: RunId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE automation_runs
            SET status = 'canceled',
                next_run_at = NULL,
                lease_expires_at = NULL,
                worker_id = NULL,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status IN ('running', 'waiting')
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Manual re-trigger of a failed run: resume at the failed step.
    ///
    /// This is a deliberate operator action; failed runs are never retried
    /// implicitly. Fails if re-enrollment is disabled and a newer run for the
    /// pair is already active (the unique index rejects the transition).
    pub async fn retry_failed(id: RunId, worker_id: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE automation_runs
            SET status = 'running',
                completed_at = NULL,
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                worker_id = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'failed'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(RUN_LEASE_MS.to_string())
        .bind(worker_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: RunId, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM automation_runs WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// All runs for one (automation, contact) pair, newest first.
    pub async fn find_for_pair(
        automation_id: AutomationId,
        contact_id: ContactId,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM automation_runs
            WHERE automation_id = $1 AND contact_id = $2
            ORDER BY started_at DESC
            "#,
        )
        .bind(automation_id)
        .bind(contact_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Runs for a contact across automations (activity feed surface).
    pub async fn find_for_contact(
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM automation_runs
            WHERE workspace_id = $1 AND contact_id = $2
            ORDER BY started_at DESC
            "#,
        )
        .bind(workspace_id)
        .bind(contact_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Waiting.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Canceled.is_terminal());
    }

    #[test]
    fn run_status_serializes_snake_case() {
        let json = serde_json::to_value(RunStatus::Waiting).unwrap();
        assert_eq!(json, "waiting");
    }
}
