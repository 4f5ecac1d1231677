// Development stand-ins for the CRM collaborators.
//
// In a deployed environment these are replaced by implementations backed by
// the CRM's contact store, billing service, and messaging providers; the
// engine only ever sees the kernel traits. The stand-ins log what they would
// deliver, which is enough to run the worker against a local database.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use automations_core::common::{ContactId, ListingId, TaskId, WorkspaceId};
use automations_core::kernel::{
    BaseEmailSender, BaseEntitlements, BaseSmsSender, BaseSnapshotProvider, BaseTaskService,
    ContactSnapshot, EmailDelivery, ListingSnapshot, SmsDelivery,
};

#[derive(Default)]
pub struct CrmSnapshotProvider;

impl CrmSnapshotProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseSnapshotProvider for CrmSnapshotProvider {
    async fn contact_snapshot(
        &self,
        _workspace_id: WorkspaceId,
        contact_id: ContactId,
    ) -> Result<Option<ContactSnapshot>> {
        // No CRM attached; report every contact as gone so runs cancel
        // cleanly instead of delivering into the void
        info!(contact_id = %contact_id, "no CRM attached, contact lookup returns none");
        Ok(None)
    }

    async fn listing_snapshot(
        &self,
        _workspace_id: WorkspaceId,
        _listing_id: ListingId,
    ) -> Result<Option<ListingSnapshot>> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct PlanEntitlements;

impl PlanEntitlements {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseEntitlements for PlanEntitlements {
    async fn can_run_automations(&self, _workspace_id: WorkspaceId) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Default)]
pub struct LoggingSmsSender;

impl LoggingSmsSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseSmsSender for LoggingSmsSender {
    async fn send_sms(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        to: &str,
        body: &str,
    ) -> Result<SmsDelivery> {
        info!(%workspace_id, %contact_id, to, body, "would send sms");
        Ok(SmsDelivery {
            success: true,
            provider_ref: None,
            error: None,
        })
    }
}

#[derive(Default)]
pub struct LoggingEmailSender;

impl LoggingEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseEmailSender for LoggingEmailSender {
    async fn send_email(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        to: &str,
        subject: &str,
        _html: &str,
    ) -> Result<EmailDelivery> {
        info!(%workspace_id, %contact_id, to, subject, "would send email");
        Ok(EmailDelivery {
            success: true,
            error: None,
        })
    }
}

#[derive(Default)]
pub struct LoggingTaskService;

impl LoggingTaskService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseTaskService for LoggingTaskService {
    async fn create_task(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        text: &str,
    ) -> Result<TaskId> {
        info!(%workspace_id, %contact_id, text, "would create task");
        Ok(TaskId::new())
    }
}
