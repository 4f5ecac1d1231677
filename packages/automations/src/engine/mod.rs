//! The workflow automation engine.
//!
//! Data flows one way: event → dispatcher → enrollment → (persisted run) →
//! scheduler → executor → ledger. The ledger is what dispatch and sweeps
//! consult to decide what is already done.

pub mod dispatcher;
#[allow(clippy::module_inception)]
mod engine;
pub mod enrollment;
pub mod event;
pub mod executor;
pub mod scheduler;
pub mod sweeper;

pub use dispatcher::{CandidateMatch, TriggerDispatcher};
pub use engine::{AutomationEngine, EventEnrollment};
pub use enrollment::{EnrollOutcome, EnrollmentManager};
pub use event::AutomationEvent;
pub use executor::{StepExecutor, StepResult};
pub use scheduler::{add_wall_clock_hours, AdvanceOutcome, StepScheduler};
pub use sweeper::{RunSweeper, SweeperConfig};
