//! Automation domain: persisted workflow definitions, runs, and the step ledger.

pub mod errors;
pub mod models;

pub use errors::AutomationConfigError;
pub use models::*;
