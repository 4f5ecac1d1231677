// Keystone CRM - Workflow Automation Engine
//
// Turns CRM domain events into durable, time-ordered sequences of outbound
// actions (SMS, email, tasks, waits) executed once per enrolled contact.
// Contact/listing CRUD, billing, and message transports are external
// collaborators consumed through the traits in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod engine;
pub mod kernel;

pub use config::*;
