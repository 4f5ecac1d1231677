// EngineKernel - core infrastructure with all dependencies
//
// The EngineKernel holds everything the automation engine needs (database pool
// plus the external collaborators) and provides access via traits for testability.

use sqlx::PgPool;
use std::sync::Arc;

use super::{
    BaseEmailSender, BaseEntitlements, BaseSmsSender, BaseSnapshotProvider, BaseTaskService,
};

/// EngineKernel holds all engine dependencies
pub struct EngineKernel {
    pub db_pool: PgPool,
    pub snapshots: Arc<dyn BaseSnapshotProvider>,
    pub entitlements: Arc<dyn BaseEntitlements>,
    pub sms: Arc<dyn BaseSmsSender>,
    pub email: Arc<dyn BaseEmailSender>,
    pub tasks: Arc<dyn BaseTaskService>,
}

impl EngineKernel {
    /// Creates a new EngineKernel with the given dependencies
    pub fn new(
        db_pool: PgPool,
        snapshots: Arc<dyn BaseSnapshotProvider>,
        entitlements: Arc<dyn BaseEntitlements>,
        sms: Arc<dyn BaseSmsSender>,
        email: Arc<dyn BaseEmailSender>,
        tasks: Arc<dyn BaseTaskService>,
    ) -> Self {
        Self {
            db_pool,
            snapshots,
            entitlements,
            sms,
            email,
            tasks,
        }
    }
}
