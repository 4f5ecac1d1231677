// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The engine treats every collaborator as a black box returning success/failure;
// it does not know or care about the underlying transport.
//
// Naming convention: Base* for trait names (e.g., BaseSmsSender)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ContactId, ListingId, TaskId, WorkspaceId};

// =============================================================================
// Snapshots (read collaborator output)
// =============================================================================

/// Point-in-time view of a contact, used for condition evaluation and as the
/// recipient of messaging steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub id: ContactId,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Arbitrary contact attributes (pipeline stage, tags, lead source, ...)
    pub fields: Value,
}

impl ContactSnapshot {
    /// Look up an attribute by name. Absent attributes return `None`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Point-in-time view of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSnapshot {
    pub id: ListingId,
    /// Arbitrary listing attributes (price, status, property type, ...)
    pub fields: Value,
}

impl ListingSnapshot {
    /// Look up an attribute by name. Absent attributes return `None`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

// =============================================================================
// Snapshot Provider Trait (read collaborator)
// =============================================================================

#[async_trait]
pub trait BaseSnapshotProvider: Send + Sync {
    /// Fetch the current snapshot of a contact.
    ///
    /// Returns `None` if the contact no longer exists in the workspace.
    async fn contact_snapshot(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
    ) -> Result<Option<ContactSnapshot>>;

    /// Fetch the current snapshot of a listing.
    ///
    /// Returns `None` if the listing no longer exists in the workspace.
    async fn listing_snapshot(
        &self,
        workspace_id: WorkspaceId,
        listing_id: ListingId,
    ) -> Result<Option<ListingSnapshot>>;
}

// =============================================================================
// Entitlements Trait (billing collaborator)
// =============================================================================

#[async_trait]
pub trait BaseEntitlements: Send + Sync {
    /// Whether the workspace's plan allows running automations.
    ///
    /// A denied workspace drops events outright; nothing is queued for later.
    async fn can_run_automations(&self, workspace_id: WorkspaceId) -> Result<bool>;
}

// =============================================================================
// SMS Sender Trait (delivery collaborator)
// =============================================================================

/// Outcome of an SMS delivery attempt.
#[derive(Debug, Clone)]
pub struct SmsDelivery {
    pub success: bool,
    /// Provider-side message reference, when the provider returns one
    pub provider_ref: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait BaseSmsSender: Send + Sync {
    /// Deliver an SMS to `to` on behalf of the workspace.
    async fn send_sms(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        to: &str,
        body: &str,
    ) -> Result<SmsDelivery>;
}

// =============================================================================
// Email Sender Trait (delivery collaborator)
// =============================================================================

/// Outcome of an email delivery attempt.
#[derive(Debug, Clone)]
pub struct EmailDelivery {
    pub success: bool,
    pub error: Option<String>,
}

#[async_trait]
pub trait BaseEmailSender: Send + Sync {
    /// Deliver an email to `to` on behalf of the workspace.
    async fn send_email(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<EmailDelivery>;
}

// =============================================================================
// Task Service Trait (CRM collaborator)
// =============================================================================

#[async_trait]
pub trait BaseTaskService: Send + Sync {
    /// Create a CRM task attached to the contact. Returns the new task's ID.
    async fn create_task(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        text: &str,
    ) -> Result<TaskId>;
}
