//! Shared test infrastructure for integration tests.

pub mod fixtures;
pub mod harness;

pub use harness::TestHarness;
