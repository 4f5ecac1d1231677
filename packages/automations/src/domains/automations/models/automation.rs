//! Automation model: one saved workflow definition per row.

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use typed_builder::TypedBuilder;

use super::super::errors::AutomationConfigError;
use super::condition::ConditionSet;
use super::step::{validate_steps, Step};
use super::trigger::{TriggerConfig, TriggerType};
use super::window::ScheduleWindow;
use crate::common::{AutomationId, WorkspaceId};

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Automation {
    #[builder(default = AutomationId::new())]
    pub id: AutomationId,
    pub workspace_id: WorkspaceId,
    pub name: String,

    // Trigger
    pub trigger_type: TriggerType,
    #[sqlx(json)]
    pub trigger_config: TriggerConfig,

    // Entry/exit gating (null entry = always match, null exit = never exits)
    #[sqlx(json(nullable))]
    #[builder(default)]
    pub entry_conditions: Option<ConditionSet>,
    #[sqlx(json(nullable))]
    #[builder(default)]
    pub exit_conditions: Option<ConditionSet>,

    // Scheduling
    #[sqlx(json(nullable))]
    #[builder(default)]
    pub schedule_window: Option<ScheduleWindow>,
    #[builder(default = "UTC".to_string())]
    pub timezone: String,

    // Ordered step sequence
    #[sqlx(json)]
    pub steps: Vec<Step>,

    #[builder(default = true)]
    pub active: bool,
    /// Whether one contact may hold multiple concurrent runs
    #[builder(default = false)]
    pub allow_reenroll: bool,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Automation {
    /// Save-time validation of the whole definition.
    ///
    /// Everything past this point (dispatch, enrollment, sweeps) assumes a
    /// validated automation and never re-checks configuration.
    pub fn validate(&self) -> Result<(), AutomationConfigError> {
        self.trigger_config.validate(self.trigger_type)?;
        if let Some(conditions) = &self.entry_conditions {
            conditions.validate()?;
        }
        if let Some(conditions) = &self.exit_conditions {
            conditions.validate()?;
        }
        if let Some(window) = &self.schedule_window {
            window.validate()?;
        }
        validate_steps(&self.steps)?;
        if self.timezone.parse::<Tz>().is_err() {
            return Err(AutomationConfigError::InvalidTimezone(
                self.timezone.clone(),
            ));
        }
        Ok(())
    }

    /// The automation's timezone for relative-time evaluation.
    ///
    /// The string is validated at save time; an unparseable value here means
    /// the row predates validation, so fall back to UTC rather than failing
    /// the run.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            warn!(automation_id = %self.id, timezone = %self.timezone, "invalid timezone, falling back to UTC");
            Tz::UTC
        })
    }

    /// Re-enrollment disabled means at most one non-terminal run per contact.
    pub fn single_enrollment(&self) -> bool {
        !self.allow_reenroll
    }

    pub async fn insert(self, pool: &PgPool) -> Result<Self> {
        self.validate()?;

        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO automations (
                id, workspace_id, name, trigger_type, trigger_config,
                entry_conditions, exit_conditions, schedule_window, timezone,
                steps, active, allow_reenroll
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.workspace_id)
        .bind(&self.name)
        .bind(self.trigger_type)
        .bind(Json(&self.trigger_config))
        .bind(self.entry_conditions.as_ref().map(Json))
        .bind(self.exit_conditions.as_ref().map(Json))
        .bind(self.schedule_window.as_ref().map(Json))
        .bind(&self.timezone)
        .bind(Json(&self.steps))
        .bind(self.active)
        .bind(self.allow_reenroll)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Full update of a definition (admin edit). In-flight runs keep their
    /// snapshotted steps; only exit conditions apply to them.
    pub async fn update(self, pool: &PgPool) -> Result<Self> {
        self.validate()?;

        sqlx::query_as::<_, Self>(
            r#"
            UPDATE automations SET
                name = $2, trigger_type = $3, trigger_config = $4,
                entry_conditions = $5, exit_conditions = $6, schedule_window = $7,
                timezone = $8, steps = $9, active = $10, allow_reenroll = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(self.trigger_type)
        .bind(Json(&self.trigger_config))
        .bind(self.entry_conditions.as_ref().map(Json))
        .bind(self.exit_conditions.as_ref().map(Json))
        .bind(self.schedule_window.as_ref().map(Json))
        .bind(&self.timezone)
        .bind(Json(&self.steps))
        .bind(self.active)
        .bind(self.allow_reenroll)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: AutomationId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM automations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Active automations in a workspace listening for the given trigger.
    pub async fn find_active_by_trigger(
        workspace_id: WorkspaceId,
        trigger_type: TriggerType,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT *
            FROM automations
            WHERE workspace_id = $1
              AND trigger_type = $2
              AND active = true
            ORDER BY created_at ASC
            "#,
        )
        .bind(workspace_id)
        .bind(trigger_type)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Flip the active flag. Deactivation blocks new enrollments only;
    /// in-flight runs are left alone.
    pub async fn set_active(id: AutomationId, active: bool, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE automations SET active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_automation() -> Automation {
        Automation::builder()
            .workspace_id(WorkspaceId::new())
            .name("Tour follow-up")
            .trigger_type(TriggerType::PipelineStageChanged)
            .trigger_config(TriggerConfig::PipelineStageChanged {
                stage: Some("toured".to_string()),
            })
            .steps(vec![
                Step::SendSms {
                    text: "Thanks for touring with us today!".to_string(),
                },
                Step::Wait { hours: 4 },
                Step::SendEmail {
                    subject: "Your tour recap".to_string(),
                    body: "<p>Here are the homes you saw.</p>".to_string(),
                },
            ])
            .build()
    }

    #[test]
    fn new_automation_is_active_with_reenrollment_disabled() {
        let automation = sample_automation();
        assert!(automation.active);
        assert!(automation.single_enrollment());
        assert_eq!(automation.timezone, "UTC");
    }

    #[test]
    fn sample_definition_validates() {
        assert!(sample_automation().validate().is_ok());
    }

    #[test]
    fn mismatched_trigger_config_fails_validation() {
        let mut automation = sample_automation();
        automation.trigger_config = TriggerConfig::NoteLogged { keyword: None };
        assert!(matches!(
            automation.validate(),
            Err(AutomationConfigError::TriggerConfigMismatch { .. })
        ));
    }

    #[test]
    fn bogus_timezone_fails_validation() {
        let mut automation = sample_automation();
        automation.timezone = "Mars/Olympus_Mons".to_string();
        assert!(matches!(
            automation.validate(),
            Err(AutomationConfigError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn tz_falls_back_to_utc_for_unvalidated_rows() {
        let mut automation = sample_automation();
        automation.timezone = "not-a-zone".to_string();
        assert_eq!(automation.tz(), Tz::UTC);
    }
}
