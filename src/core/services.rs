// src/core/services.rs

use async_trait::async_trait;

use crate::core::error::ScanError;
use crate::core::models::{FollowUpTask, LinkRecord, TaskReceipt};

/// The link registry the general scan reads its targets from.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn get_targets(&self) -> Result<Vec<LinkRecord>, ScanError>;
}

/// Where follow-up tracking tasks are filed.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn create_task(&self, task: &FollowUpTask) -> Result<TaskReceipt, ScanError>;
}
