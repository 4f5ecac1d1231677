pub mod automation;
pub mod condition;
pub mod run;
pub mod run_step;
pub mod step;
pub mod trigger;
pub mod window;

pub use automation::Automation;
pub use condition::{Condition, ConditionOp, ConditionSet, ConditionSubject};
pub use run::{Run, RunStatus};
pub use run_step::{RunStep, RunStepStatus};
pub use step::{validate_steps, Step};
pub use trigger::{TriggerConfig, TriggerType};
pub use window::ScheduleWindow;
