// TestDependencies - mock implementations for testing
//
// Provides mock collaborators that can be injected into EngineKernel for tests.
// Each mock records its calls so tests can assert on what the engine delivered.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    BaseEmailSender, BaseEntitlements, BaseSmsSender, BaseSnapshotProvider, BaseTaskService,
    ContactSnapshot, EmailDelivery, EngineKernel, ListingSnapshot, SmsDelivery,
};
use crate::common::{ContactId, ListingId, TaskId, WorkspaceId};

// =============================================================================
// Mock Snapshot Provider
// =============================================================================

/// In-memory contact/listing store standing in for the CRM read side.
#[derive(Default)]
pub struct MockSnapshotProvider {
    contacts: Mutex<HashMap<ContactId, ContactSnapshot>>,
    listings: Mutex<HashMap<ListingId, ListingSnapshot>>,
}

impl MockSnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_contact(&self, snapshot: ContactSnapshot) {
        self.contacts.lock().unwrap().insert(snapshot.id, snapshot);
    }

    pub fn put_listing(&self, snapshot: ListingSnapshot) {
        self.listings.lock().unwrap().insert(snapshot.id, snapshot);
    }

    /// Mutate one attribute of a stored contact (e.g. to flip an exit condition).
    pub fn set_contact_field(&self, contact_id: ContactId, name: &str, value: serde_json::Value) {
        let mut contacts = self.contacts.lock().unwrap();
        if let Some(snapshot) = contacts.get_mut(&contact_id) {
            if let Some(map) = snapshot.fields.as_object_mut() {
                map.insert(name.to_string(), value);
            }
        }
    }

    /// Simulate the contact being deleted from the CRM.
    pub fn remove_contact(&self, contact_id: ContactId) {
        self.contacts.lock().unwrap().remove(&contact_id);
    }
}

#[async_trait]
impl BaseSnapshotProvider for MockSnapshotProvider {
    async fn contact_snapshot(
        &self,
        _workspace_id: WorkspaceId,
        contact_id: ContactId,
    ) -> Result<Option<ContactSnapshot>> {
        Ok(self.contacts.lock().unwrap().get(&contact_id).cloned())
    }

    async fn listing_snapshot(
        &self,
        _workspace_id: WorkspaceId,
        listing_id: ListingId,
    ) -> Result<Option<ListingSnapshot>> {
        Ok(self.listings.lock().unwrap().get(&listing_id).cloned())
    }
}

// =============================================================================
// Mock Entitlements
// =============================================================================

pub struct MockEntitlements {
    allowed: AtomicBool,
}

impl Default for MockEntitlements {
    fn default() -> Self {
        Self {
            allowed: AtomicBool::new(true),
        }
    }
}

impl MockEntitlements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self) {
        self.allowed.store(false, Ordering::SeqCst);
    }

    pub fn allow(&self) {
        self.allowed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BaseEntitlements for MockEntitlements {
    async fn can_run_automations(&self, _workspace_id: WorkspaceId) -> Result<bool> {
        Ok(self.allowed.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Mock SMS Sender
// =============================================================================

/// Arguments captured from a send_sms call
#[derive(Debug, Clone)]
pub struct SmsCall {
    pub workspace_id: WorkspaceId,
    pub contact_id: ContactId,
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct MockSmsSender {
    calls: Mutex<Vec<SmsCall>>,
    fail_with: Mutex<Option<String>>,
}

impl MockSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail with the given provider error.
    pub fn fail_with(&self, error: &str) {
        *self.fail_with.lock().unwrap() = Some(error.to_string());
    }

    /// Clear a previously injected failure so deliveries succeed again.
    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<SmsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseSmsSender for MockSmsSender {
    async fn send_sms(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        to: &str,
        body: &str,
    ) -> Result<SmsDelivery> {
        self.calls.lock().unwrap().push(SmsCall {
            workspace_id,
            contact_id,
            to: to.to_string(),
            body: body.to_string(),
        });

        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Ok(SmsDelivery {
                success: false,
                provider_ref: None,
                error: Some(error),
            });
        }

        Ok(SmsDelivery {
            success: true,
            provider_ref: Some(format!("SM{}", self.calls.lock().unwrap().len())),
            error: None,
        })
    }
}

// =============================================================================
// Mock Email Sender
// =============================================================================

/// Arguments captured from a send_email call
#[derive(Debug, Clone)]
pub struct EmailCall {
    pub workspace_id: WorkspaceId,
    pub contact_id: ContactId,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct MockEmailSender {
    calls: Mutex<Vec<EmailCall>>,
    fail_with: Mutex<Option<String>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail with the given provider error.
    pub fn fail_with(&self, error: &str) {
        *self.fail_with.lock().unwrap() = Some(error.to_string());
    }

    /// Clear a previously injected failure so deliveries succeed again.
    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<EmailCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseEmailSender for MockEmailSender {
    async fn send_email(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<EmailDelivery> {
        self.calls.lock().unwrap().push(EmailCall {
            workspace_id,
            contact_id,
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });

        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Ok(EmailDelivery {
                success: false,
                error: Some(error),
            });
        }

        Ok(EmailDelivery {
            success: true,
            error: None,
        })
    }
}

// =============================================================================
// Mock Task Service
// =============================================================================

/// Arguments captured from a create_task call
#[derive(Debug, Clone)]
pub struct TaskCall {
    pub workspace_id: WorkspaceId,
    pub contact_id: ContactId,
    pub text: String,
}

#[derive(Default)]
pub struct MockTaskService {
    calls: Mutex<Vec<TaskCall>>,
}

impl MockTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TaskCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseTaskService for MockTaskService {
    async fn create_task(
        &self,
        workspace_id: WorkspaceId,
        contact_id: ContactId,
        text: &str,
    ) -> Result<TaskId> {
        self.calls.lock().unwrap().push(TaskCall {
            workspace_id,
            contact_id,
            text: text.to_string(),
        });
        Ok(TaskId::new())
    }
}

// =============================================================================
// TestDependencies bundle
// =============================================================================

/// All mock collaborators plus the kernel wired to them.
///
/// Tests keep the `Arc`s to the mocks so they can inject failures and assert
/// on recorded calls while the engine only sees the trait objects.
pub struct TestDependencies {
    pub kernel: Arc<EngineKernel>,
    pub snapshots: Arc<MockSnapshotProvider>,
    pub entitlements: Arc<MockEntitlements>,
    pub sms: Arc<MockSmsSender>,
    pub email: Arc<MockEmailSender>,
    pub tasks: Arc<MockTaskService>,
}

impl TestDependencies {
    pub fn new(db_pool: PgPool) -> Self {
        let snapshots = Arc::new(MockSnapshotProvider::new());
        let entitlements = Arc::new(MockEntitlements::new());
        let sms = Arc::new(MockSmsSender::new());
        let email = Arc::new(MockEmailSender::new());
        let tasks = Arc::new(MockTaskService::new());

        let kernel = Arc::new(EngineKernel::new(
            db_pool,
            snapshots.clone(),
            entitlements.clone(),
            sms.clone(),
            email.clone(),
            tasks.clone(),
        ));

        Self {
            kernel,
            snapshots,
            entitlements,
            sms,
            email,
            tasks,
        }
    }
}
