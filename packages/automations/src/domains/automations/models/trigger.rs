//! Trigger types and their event-specific filters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::super::errors::AutomationConfigError;

/// The domain event kind an automation listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trigger_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    ListingCreated,
    PipelineStageChanged,
    NoteLogged,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::ListingCreated => "listing_created",
            TriggerType::PipelineStageChanged => "pipeline_stage_changed",
            TriggerType::NoteLogged => "note_logged",
        }
    }
}

/// Event-specific filter applied before entry conditions.
///
/// Stored as JSONB on the automation; the variant must agree with the
/// automation's trigger type (checked at save time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    ListingCreated {
        /// Only fire for listings of this property type when set
        #[serde(default)]
        property_type: Option<String>,
    },
    PipelineStageChanged {
        /// Only fire when the contact lands on this stage when set
        #[serde(default)]
        stage: Option<String>,
    },
    NoteLogged {
        /// Only fire when the note body contains this keyword when set
        #[serde(default)]
        keyword: Option<String>,
    },
}

impl TriggerConfig {
    /// The trigger type this config belongs to.
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            TriggerConfig::ListingCreated { .. } => TriggerType::ListingCreated,
            TriggerConfig::PipelineStageChanged { .. } => TriggerType::PipelineStageChanged,
            TriggerConfig::NoteLogged { .. } => TriggerType::NoteLogged,
        }
    }

    /// Apply the filter to an event payload.
    ///
    /// A non-match is the common case and not an error; missing payload fields
    /// simply fail the filter.
    pub fn matches(&self, payload: &Value) -> bool {
        match self {
            TriggerConfig::ListingCreated { property_type } => match property_type {
                None => true,
                Some(expected) => payload
                    .get("property_type")
                    .and_then(Value::as_str)
                    .map(|actual| actual == expected)
                    .unwrap_or(false),
            },
            TriggerConfig::PipelineStageChanged { stage } => match stage {
                None => true,
                Some(expected) => payload
                    .get("stage")
                    .and_then(Value::as_str)
                    .map(|actual| actual == expected)
                    .unwrap_or(false),
            },
            TriggerConfig::NoteLogged { keyword } => match keyword {
                None => true,
                Some(keyword) => payload
                    .get("content")
                    .and_then(Value::as_str)
                    .map(|content| content.contains(keyword.as_str()))
                    .unwrap_or(false),
            },
        }
    }

    /// Save-time check that the config variant agrees with the trigger type.
    pub fn validate(&self, trigger_type: TriggerType) -> Result<(), AutomationConfigError> {
        if self.trigger_type() != trigger_type {
            return Err(AutomationConfigError::TriggerConfigMismatch {
                trigger_type: trigger_type.as_str().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_filter_matches_target_stage_only() {
        let config = TriggerConfig::PipelineStageChanged {
            stage: Some("under_contract".to_string()),
        };
        assert!(config.matches(&json!({"stage": "under_contract"})));
        assert!(!config.matches(&json!({"stage": "showing"})));
        assert!(!config.matches(&json!({})));
    }

    #[test]
    fn property_type_filter_matches_target_type_only() {
        let config = TriggerConfig::ListingCreated {
            property_type: Some("condo".to_string()),
        };
        assert!(config.matches(&json!({"property_type": "condo"})));
        assert!(!config.matches(&json!({"property_type": "single_family"})));
        assert!(!config.matches(&json!({})));

        let unfiltered = TriggerConfig::ListingCreated {
            property_type: None,
        };
        assert!(unfiltered.matches(&json!({})));
    }

    #[test]
    fn unfiltered_config_matches_any_payload() {
        let config = TriggerConfig::PipelineStageChanged { stage: None };
        assert!(config.matches(&json!({"stage": "anything"})));
        assert!(config.matches(&json!({})));
    }

    #[test]
    fn note_keyword_filter() {
        let config = TriggerConfig::NoteLogged {
            keyword: Some("offer".to_string()),
        };
        assert!(config.matches(&json!({"content": "Buyer wants to make an offer"})));
        assert!(!config.matches(&json!({"content": "Left voicemail"})));
    }

    #[test]
    fn validate_rejects_variant_mismatch() {
        let config = TriggerConfig::NoteLogged { keyword: None };
        assert!(config.validate(TriggerType::NoteLogged).is_ok());
        assert!(matches!(
            config.validate(TriggerType::ListingCreated),
            Err(AutomationConfigError::TriggerConfigMismatch { .. })
        ));
    }

    #[test]
    fn trigger_config_json_shape() {
        let config = TriggerConfig::PipelineStageChanged {
            stage: Some("nurture".to_string()),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["type"], "pipeline_stage_changed");
        assert_eq!(json["stage"], "nurture");
    }
}
