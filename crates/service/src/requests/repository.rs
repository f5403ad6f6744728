use async_trait::async_trait;
use models::{MediaRequest, RequestEdit};

use crate::errors::ServiceError;

/// Storage seam for media requests.
///
/// Listing methods return newest first (`RequestedDate` descending, ties by id).
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn put(&self, request: MediaRequest) -> Result<(), ServiceError>;
    async fn get(&self, id: &str) -> Result<Option<MediaRequest>, ServiceError>;
    async fn list(&self) -> Result<Vec<MediaRequest>, ServiceError>;
    async fn list_by(&self, owner_id: &str) -> Result<Vec<MediaRequest>, ServiceError>;
    /// Apply `edit` atomically; `None` when the id is unknown.
    async fn modify(&self, id: &str, edit: RequestEdit) -> Result<Option<MediaRequest>, ServiceError>;
    /// Idempotent; returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, ServiceError>;
}
