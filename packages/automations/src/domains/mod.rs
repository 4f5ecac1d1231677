pub mod automations;
