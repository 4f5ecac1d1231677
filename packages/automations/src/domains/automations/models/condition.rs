//! Entry/exit condition expressions.
//!
//! A `ConditionSet` is a flat boolean combinator over contact/listing
//! attributes. Evaluation is pure and total: an absent field makes the clause
//! false rather than erroring, and a missing listing snapshot makes every
//! listing clause false. Malformed expressions are rejected at save time by
//! [`ConditionSet::validate`]; evaluation assumes validated input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::super::errors::AutomationConfigError;
use crate::kernel::{ContactSnapshot, ListingSnapshot};

/// Which snapshot a condition reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSubject {
    Contact,
    Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    IsSet,
    IsNotSet,
}

impl ConditionOp {
    fn as_str(&self) -> &'static str {
        match self {
            ConditionOp::Equals => "equals",
            ConditionOp::NotEquals => "not_equals",
            ConditionOp::Contains => "contains",
            ConditionOp::GreaterThan => "greater_than",
            ConditionOp::LessThan => "less_than",
            ConditionOp::IsSet => "is_set",
            ConditionOp::IsNotSet => "is_not_set",
        }
    }
}

/// One clause over a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub subject: ConditionSubject,
    pub field: String,
    pub op: ConditionOp,
    #[serde(default)]
    pub value: Value,
}

/// Boolean combination of clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSet {
    /// Every clause must match. Empty means "always matches".
    All(Vec<Condition>),
    /// At least one clause must match. Empty means "never matches".
    Any(Vec<Condition>),
}

impl Condition {
    fn evaluate(&self, contact: &ContactSnapshot, listing: Option<&ListingSnapshot>) -> bool {
        let field = match self.subject {
            ConditionSubject::Contact => contact.field(&self.field),
            ConditionSubject::Listing => match listing {
                Some(listing) => listing.field(&self.field),
                None => None,
            },
        };

        match self.op {
            ConditionOp::IsSet => matches!(field, Some(v) if !v.is_null()),
            ConditionOp::IsNotSet => !matches!(field, Some(v) if !v.is_null()),
            ConditionOp::Equals => field.map(|v| v == &self.value).unwrap_or(false),
            ConditionOp::NotEquals => field.map(|v| v != &self.value).unwrap_or(false),
            ConditionOp::Contains => match (field, self.value.as_str()) {
                (Some(Value::String(haystack)), Some(needle)) => haystack.contains(needle),
                (Some(Value::Array(items)), _) => items.contains(&self.value),
                _ => false,
            },
            ConditionOp::GreaterThan => compare_numbers(field, &self.value)
                .map(|ordering| ordering == std::cmp::Ordering::Greater)
                .unwrap_or(false),
            ConditionOp::LessThan => compare_numbers(field, &self.value)
                .map(|ordering| ordering == std::cmp::Ordering::Less)
                .unwrap_or(false),
        }
    }

    fn validate(&self) -> Result<(), AutomationConfigError> {
        if self.field.trim().is_empty() {
            return Err(AutomationConfigError::EmptyConditionField);
        }

        if matches!(self.op, ConditionOp::GreaterThan | ConditionOp::LessThan)
            && self.value.as_f64().is_none()
        {
            return Err(AutomationConfigError::NonNumericComparison {
                field: self.field.clone(),
                op: self.op.as_str().to_string(),
            });
        }

        Ok(())
    }
}

impl ConditionSet {
    /// Pure match check against the given snapshots.
    pub fn evaluate(&self, contact: &ContactSnapshot, listing: Option<&ListingSnapshot>) -> bool {
        match self {
            ConditionSet::All(conditions) => conditions
                .iter()
                .all(|condition| condition.evaluate(contact, listing)),
            ConditionSet::Any(conditions) => conditions
                .iter()
                .any(|condition| condition.evaluate(contact, listing)),
        }
    }

    /// Save-time validation; evaluation never re-checks.
    pub fn validate(&self) -> Result<(), AutomationConfigError> {
        let conditions = match self {
            ConditionSet::All(conditions) | ConditionSet::Any(conditions) => conditions,
        };
        for condition in conditions {
            condition.validate()?;
        }
        Ok(())
    }
}

fn compare_numbers(field: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let actual = field?.as_f64()?;
    let expected = expected.as_f64()?;
    actual.partial_cmp(&expected)
}
