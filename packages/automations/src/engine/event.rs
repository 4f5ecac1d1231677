//! Inbound domain events.
//!
//! Producers (listing save, pipeline move, note creation) construct one of
//! these after their own writes commit; the engine never participates in the
//! producer's transaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ContactId, ListingId, WorkspaceId};
use crate::domains::automations::TriggerType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub workspace_id: WorkspaceId,
    pub trigger_type: TriggerType,
    pub contact_id: ContactId,
    #[serde(default)]
    pub listing_id: Option<ListingId>,
    /// Event-specific data the trigger filter reads (e.g. the new stage)
    #[serde(default)]
    pub payload: Value,
}

impl AutomationEvent {
    pub fn new(
        workspace_id: WorkspaceId,
        trigger_type: TriggerType,
        contact_id: ContactId,
    ) -> Self {
        Self {
            workspace_id,
            trigger_type,
            contact_id,
            listing_id: None,
            payload: Value::Null,
        }
    }

    pub fn with_listing(mut self, listing_id: ListingId) -> Self {
        self.listing_id = Some(listing_id);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}
