//! RunStep model: the append-only execution ledger.
//!
//! One row per step attempt, never mutated after insert. The ledger serves
//! the CRM's activity views and is the only idempotency source the scheduler
//! consults: a step (re-)executes only if no `success` row exists for its
//! (run, index).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::{RunId, RunStepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "run_step_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStepStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct RunStep {
    pub id: RunStepId,
    pub run_id: RunId,
    pub step_index: i32,
    pub step_type: String,
    pub status: RunStepStatus,
    pub message: String,
    pub executed_at: DateTime<Utc>,
}

impl RunStep {
    /// Append one attempt record. This insert must commit before the run's
    /// own status transition so a sweep that sees the new run state also sees
    /// the ledger row.
    pub async fn record(
        run_id: RunId,
        step_index: i32,
        step_type: &str,
        status: RunStepStatus,
        message: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO automation_run_steps (id, run_id, step_index, step_type, status, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(RunStepId::new())
        .bind(run_id)
        .bind(step_index)
        .bind(step_type)
        .bind(status)
        .bind(message)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Whether a successful attempt already exists for (run, index).
    pub async fn success_exists(run_id: RunId, step_index: i32, pool: &PgPool) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM automation_run_steps
                WHERE run_id = $1 AND step_index = $2 AND status = 'success'
            )
            "#,
        )
        .bind(run_id)
        .bind(step_index)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Full attempt history for a run, in execution order.
    pub async fn find_for_run(run_id: RunId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM automation_run_steps
            WHERE run_id = $1
            ORDER BY step_index ASC, executed_at ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
