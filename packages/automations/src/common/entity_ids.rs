//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the engine.

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Workspace entities (tenants).
pub struct Workspace;

/// Marker type for Contact entities (CRM contacts).
pub struct Contact;

/// Marker type for Listing entities (real-estate listings).
pub struct Listing;

/// Marker type for Automation entities (workflow definitions).
pub struct Automation;

/// Marker type for Run entities (one automation applied to one contact).
pub struct Run;

/// Marker type for RunStep entities (step execution records).
pub struct RunStep;

/// Marker type for Task entities (tasks created by automation steps).
pub struct Task;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Workspace entities.
pub type WorkspaceId = Id<Workspace>;

/// Typed ID for Contact entities.
pub type ContactId = Id<Contact>;

/// Typed ID for Listing entities.
pub type ListingId = Id<Listing>;

/// Typed ID for Automation entities.
pub type AutomationId = Id<Automation>;

/// Typed ID for Run entities.
pub type RunId = Id<Run>;

/// Typed ID for RunStep entities.
pub type RunStepId = Id<RunStep>;

/// Typed ID for Task entities.
pub type TaskId = Id<Task>;
