//! Step sequence model.
//!
//! Steps are stored as a JSONB array of tagged variants and validated when the
//! automation is saved. A run snapshots the sequence at enrollment time, so
//! editing an automation never changes steps a run is already executing.

use serde::{Deserialize, Serialize};

use super::super::errors::AutomationConfigError;

/// One element of an automation's ordered step sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    SendSms { text: String },
    SendEmail { subject: String, body: String },
    CreateTask { text: String },
    Wait { hours: i64 },
}

impl Step {
    /// Stable tag used in RunStep records and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::SendSms { .. } => "send_sms",
            Step::SendEmail { .. } => "send_email",
            Step::CreateTask { .. } => "create_task",
            Step::Wait { .. } => "wait",
        }
    }

    /// Wait steps are handled by the scheduler; everything else by the executor.
    pub fn is_wait(&self) -> bool {
        matches!(self, Step::Wait { .. })
    }
}

/// Validate a step sequence at automation save time.
///
/// The runtime assumes sequences passed this check, so it never re-validates.
pub fn validate_steps(steps: &[Step]) -> Result<(), AutomationConfigError> {
    if steps.is_empty() {
        return Err(AutomationConfigError::EmptyStepSequence);
    }

    for (index, step) in steps.iter().enumerate() {
        match step {
            Step::SendSms { text } | Step::CreateTask { text } => {
                if text.trim().is_empty() {
                    return Err(AutomationConfigError::BlankStepText { index });
                }
            }
            Step::SendEmail { subject, .. } => {
                if subject.trim().is_empty() {
                    return Err(AutomationConfigError::BlankStepText { index });
                }
            }
            Step::Wait { hours } => {
                if *hours <= 0 {
                    return Err(AutomationConfigError::NonPositiveWait { index });
                }
            }
        }
    }

    // A trailing wait would park the run with nothing left to execute
    if let Some(Step::Wait { .. }) = steps.last() {
        return Err(AutomationConfigError::TrailingWait);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_json_shape_is_tagged_snake_case() {
        let step = Step::SendSms {
            text: "Welcome aboard".to_string(),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "send_sms");
        assert_eq!(json["text"], "Welcome aboard");
    }

    #[test]
    fn wait_step_roundtrips() {
        let json = serde_json::json!({"type": "wait", "hours": 4});
        let step: Step = serde_json::from_value(json).unwrap();
        assert_eq!(step, Step::Wait { hours: 4 });
        assert!(step.is_wait());
    }

    #[test]
    fn unknown_step_type_is_rejected() {
        let json = serde_json::json!({"type": "send_carrier_pigeon", "text": "hi"});
        assert!(serde_json::from_value::<Step>(json).is_err());
    }

    #[test]
    fn empty_sequence_is_invalid() {
        assert!(matches!(
            validate_steps(&[]),
            Err(AutomationConfigError::EmptyStepSequence)
        ));
    }

    #[test]
    fn zero_hour_wait_is_invalid() {
        let steps = vec![
            Step::Wait { hours: 0 },
            Step::SendSms {
                text: "hello".to_string(),
            },
        ];
        assert!(matches!(
            validate_steps(&steps),
            Err(AutomationConfigError::NonPositiveWait { index: 0 })
        ));
    }

    #[test]
    fn trailing_wait_is_invalid() {
        let steps = vec![
            Step::SendSms {
                text: "hello".to_string(),
            },
            Step::Wait { hours: 2 },
        ];
        assert!(matches!(
            validate_steps(&steps),
            Err(AutomationConfigError::TrailingWait)
        ));
    }

    #[test]
    fn typical_sequence_is_valid() {
        let steps = vec![
            Step::SendSms {
                text: "Thanks for touring with us!".to_string(),
            },
            Step::Wait { hours: 4 },
            Step::SendEmail {
                subject: "Next steps".to_string(),
                body: "<p>Here is what happens next.</p>".to_string(),
            },
            Step::CreateTask {
                text: "Call to debrief the tour".to_string(),
            },
        ];
        assert!(validate_steps(&steps).is_ok());
    }
}
