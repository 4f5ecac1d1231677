//! Test fixtures for creating automations, contacts, and events.
//!
//! Fixtures return un-inserted models so individual tests can tweak fields
//! (re-enrollment, exit conditions, windows) before calling `insert`.

use anyhow::Result;
use serde_json::json;
use sqlx::PgPool;

use automations_core::common::{ContactId, RunId, WorkspaceId};
use automations_core::domains::automations::{Automation, Step, TriggerConfig, TriggerType};
use automations_core::engine::AutomationEvent;
use automations_core::kernel::ContactSnapshot;

/// A contact with both delivery channels and a couple of CRM attributes.
pub fn test_contact() -> ContactSnapshot {
    ContactSnapshot {
        id: ContactId::new(),
        phone: Some("+16125550147".to_string()),
        email: Some("jordan@example.com".to_string()),
        fields: json!({
            "stage": "toured",
            "lead_source": "zillow",
        }),
    }
}

/// The canonical follow-up sequence: SMS now, wait four hours, then an email.
pub fn tour_followup(workspace_id: WorkspaceId) -> Automation {
    automation_with_steps(
        workspace_id,
        vec![
            Step::SendSms {
                text: "Thanks for touring with us today!".to_string(),
            },
            Step::Wait { hours: 4 },
            Step::SendEmail {
                subject: "Your tour recap".to_string(),
                body: "<p>Here are the homes you saw.</p>".to_string(),
            },
        ],
    )
}

/// An automation on the `pipeline_stage_changed("toured")` trigger with the
/// given step sequence.
pub fn automation_with_steps(workspace_id: WorkspaceId, steps: Vec<Step>) -> Automation {
    Automation::builder()
        .workspace_id(workspace_id)
        .name("Tour follow-up")
        .trigger_type(TriggerType::PipelineStageChanged)
        .trigger_config(TriggerConfig::PipelineStageChanged {
            stage: Some("toured".to_string()),
        })
        .steps(steps)
        .build()
}

/// The event the `tour_followup` fixture listens for.
pub fn toured_event(workspace_id: WorkspaceId, contact_id: ContactId) -> AutomationEvent {
    AutomationEvent::new(
        workspace_id,
        TriggerType::PipelineStageChanged,
        contact_id,
    )
    .with_payload(json!({"stage": "toured"}))
}

/// Pull a waiting run's resume time into the past so the next sweep claims it.
pub async fn make_due(pool: &PgPool, run_id: RunId) -> Result<()> {
    sqlx::query(
        "UPDATE automation_runs SET next_run_at = NOW() - INTERVAL '1 minute' WHERE id = $1",
    )
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Expire a running run's lease, as if the worker holding it crashed.
pub async fn expire_lease(pool: &PgPool, run_id: RunId) -> Result<()> {
    sqlx::query(
        "UPDATE automation_runs SET lease_expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1",
    )
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}
