//! Support request lifecycle: create, look up, resolve, list pending.

use crate::error::DeskError;
use crate::storage::{
    NewRequest, PendingRequest, RequestStats, Resolution, StorageProvider, SupportRequest,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns every mutation of support requests
#[derive(Clone)]
pub struct RequestStore {
    storage: Arc<dyn StorageProvider>,
}

impl RequestStore {
    /// Create a store over `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    /// Persist a new request and return its id
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` on storage failure.
    pub async fn create(&self, request: NewRequest) -> Result<i64, DeskError> {
        Ok(self.storage.create_request(request).await?)
    }

    /// Fetch a request by id
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `StorageUnavailable` on storage failure.
    pub async fn get(&self, request_id: i64) -> Result<SupportRequest, DeskError> {
        self.storage
            .get_request(request_id)
            .await?
            .ok_or(DeskError::NotFound(request_id))
    }

    /// Record `answer` on an existing request assigned to `manager_id`.
    ///
    /// The existing row is updated in place and becomes `resolved`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` (not assigned to this manager), `AlreadyResolved`,
    /// or `StorageUnavailable`.
    pub async fn update_resolution(
        &self,
        request_id: i64,
        answer: &str,
        manager_id: i64,
    ) -> Result<SupportRequest, DeskError> {
        match self
            .storage
            .resolve_request(request_id, answer.to_string(), manager_id)
            .await?
        {
            Resolution::Resolved(request) => {
                info!("Request #{request_id} resolved by manager {manager_id}.");
                Ok(request)
            }
            Resolution::NotFound => Err(DeskError::NotFound(request_id)),
            Resolution::Forbidden => {
                warn!("Manager {manager_id} tried to answer request #{request_id} assigned elsewhere.");
                Err(DeskError::Forbidden(format!(
                    "request #{request_id} is not assigned to manager {manager_id}"
                )))
            }
            Resolution::AlreadyResolved => Err(DeskError::AlreadyResolved(request_id)),
        }
    }

    /// Unanswered requests assigned to `manager_id`, in creation order
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` on storage failure.
    pub async fn pending_for_manager(
        &self,
        manager_id: i64,
    ) -> Result<Vec<PendingRequest>, DeskError> {
        Ok(self.storage.pending_for_manager(manager_id).await?)
    }

    /// Aggregate counters
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` on storage failure.
    pub async fn stats(&self) -> Result<RequestStats, DeskError> {
        Ok(self.storage.request_stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RequestStatus, SqliteStorage};

    fn store() -> Result<RequestStore, DeskError> {
        Ok(RequestStore::new(Arc::new(SqliteStorage::open_in_memory()?)))
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() -> Result<(), DeskError> {
        let store = store()?;
        assert!(matches!(store.get(77).await, Err(DeskError::NotFound(77))));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolution_is_visible_and_leaves_pending_list() -> Result<(), DeskError> {
        let store = store()?;
        let id = store.create(NewRequest::new(5, "where is it?").assigned_to(9)).await?;
        assert_eq!(store.pending_for_manager(9).await?.len(), 1);

        store.update_resolution(id, "on its way", 9).await?;

        let request = store.get(id).await?;
        assert_eq!(request.status, RequestStatus::Resolved);
        assert_eq!(request.answer.as_deref(), Some("on its way"));
        assert_eq!(request.manager_id, Some(9));
        assert!(store.pending_for_manager(9).await?.is_empty());
        assert_eq!(store.stats().await?.total(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_manager_is_forbidden() -> Result<(), DeskError> {
        let store = store()?;
        let id = store.create(NewRequest::new(5, "q").assigned_to(2)).await?;

        let result = store.update_resolution(id, "mine now", 1).await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));

        let request = store.get(id).await?;
        assert_eq!(request.status, RequestStatus::New);
        assert_eq!(request.answer, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_answer_is_rejected() -> Result<(), DeskError> {
        let store = store()?;
        let id = store.create(NewRequest::new(5, "q").assigned_to(2)).await?;
        store.update_resolution(id, "first", 2).await?;

        let again = store.update_resolution(id, "second", 2).await;
        assert!(matches!(again, Err(DeskError::AlreadyResolved(i)) if i == id));
        assert_eq!(store.get(id).await?.answer.as_deref(), Some("first"));
        Ok(())
    }
}
