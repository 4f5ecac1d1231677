//! Trigger dispatcher: turns one domain event into zero or more enrollment
//! candidates. Decides only; creates no state.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use super::event::AutomationEvent;
use crate::domains::automations::Automation;
use crate::kernel::{ContactSnapshot, EngineKernel, ListingSnapshot};

/// An automation that matched an event, bundled with the snapshots the match
/// was evaluated against (reused downstream to avoid re-fetching).
pub struct CandidateMatch {
    pub automation: Automation,
    pub contact: ContactSnapshot,
    pub listing: Option<ListingSnapshot>,
}

pub struct TriggerDispatcher {
    kernel: Arc<EngineKernel>,
}

impl TriggerDispatcher {
    pub fn new(kernel: Arc<EngineKernel>) -> Self {
        Self { kernel }
    }

    /// Find every active automation in the event's workspace that the event
    /// qualifies for. Non-matches are dropped silently; no match is the
    /// common case, not an error.
    pub async fn dispatch(&self, event: &AutomationEvent) -> Result<Vec<CandidateMatch>> {
        // Entitlement gate: denied workspaces drop events outright
        if !self
            .kernel
            .entitlements
            .can_run_automations(event.workspace_id)
            .await?
        {
            debug!(
                workspace_id = %event.workspace_id,
                trigger_type = event.trigger_type.as_str(),
                "workspace not entitled to automations, dropping event"
            );
            return Ok(Vec::new());
        }

        let automations = Automation::find_active_by_trigger(
            event.workspace_id,
            event.trigger_type,
            &self.kernel.db_pool,
        )
        .await?;

        // Trigger-config filter first; it needs no snapshot fetch
        let automations: Vec<Automation> = automations
            .into_iter()
            .filter(|automation| automation.trigger_config.matches(&event.payload))
            .collect();

        if automations.is_empty() {
            return Ok(Vec::new());
        }

        let Some(contact) = self
            .kernel
            .snapshots
            .contact_snapshot(event.workspace_id, event.contact_id)
            .await?
        else {
            debug!(contact_id = %event.contact_id, "contact not found, dropping event");
            return Ok(Vec::new());
        };

        let listing = match event.listing_id {
            Some(listing_id) => {
                self.kernel
                    .snapshots
                    .listing_snapshot(event.workspace_id, listing_id)
                    .await?
            }
            None => None,
        };

        let candidates = automations
            .into_iter()
            .filter(|automation| match &automation.entry_conditions {
                Some(conditions) => conditions.evaluate(&contact, listing.as_ref()),
                None => true,
            })
            .map(|automation| CandidateMatch {
                automation,
                contact: contact.clone(),
                listing: listing.clone(),
            })
            .collect();

        Ok(candidates)
    }
}
