//! Configuration errors surfaced when an automation is saved.
//!
//! The runtime engine never sees these: malformed trigger config, conditions,
//! or step sequences are rejected before anything is persisted, so dispatch
//! and sweeps can assume pre-validated data.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AutomationConfigError {
    #[error("step sequence must contain at least one step")]
    EmptyStepSequence,

    #[error("step {index} has blank text")]
    BlankStepText { index: usize },

    #[error("wait step {index} must be at least one hour")]
    NonPositiveWait { index: usize },

    #[error("step sequence must not end with a wait")]
    TrailingWait,

    #[error("condition has an empty field name")]
    EmptyConditionField,

    #[error("condition on '{field}' requires a numeric value for {op}")]
    NonNumericComparison { field: String, op: String },

    #[error("trigger config does not match trigger type '{trigger_type}'")]
    TriggerConfigMismatch { trigger_type: String },

    #[error("'{0}' is not a valid IANA timezone")]
    InvalidTimezone(String),

    #[error("schedule window hours must be within 0-23 and start before end")]
    InvalidScheduleWindow,
}
