//! Assignment of free-text questions to managers.

use crate::error::DeskError;
use crate::managers::ManagerRegistry;
use crate::requests::RequestStore;
use crate::storage::NewRequest;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

/// Where a routed question ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No manager was registered; the request waits without an owner
    Unassigned {
        /// Stored request id
        request_id: i64,
    },
    /// The request was assigned to `manager_id`
    Assigned {
        /// Stored request id
        request_id: i64,
        /// Chosen manager
        manager_id: i64,
    },
}

/// Pick one manager uniformly at random
pub fn pick_manager<R: Rng + ?Sized>(managers: &[i64], rng: &mut R) -> Option<i64> {
    managers.choose(rng).copied()
}

/// Routes incoming questions to a random registered manager
#[derive(Clone)]
pub struct Router {
    registry: ManagerRegistry,
    requests: RequestStore,
}

impl Router {
    /// Create a router over the registry and request store
    #[must_use]
    pub const fn new(registry: ManagerRegistry, requests: RequestStore) -> Self {
        Self { registry, requests }
    }

    /// Persist `question` from `user_id` and assign it to a manager if any exists
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the manager list or the insert fails.
    pub async fn route(&self, user_id: i64, question: &str) -> Result<RouteOutcome, DeskError> {
        let managers: Vec<i64> = self.registry.all_managers().await?.into_iter().collect();
        let chosen = pick_manager(&managers, &mut rand::rng());

        let Some(manager_id) = chosen else {
            let request_id = self.requests.create(NewRequest::new(user_id, question)).await?;
            info!("No managers available, request #{request_id} left unassigned.");
            return Ok(RouteOutcome::Unassigned { request_id });
        };

        let request_id = self
            .requests
            .create(NewRequest::new(user_id, question).assigned_to(manager_id))
            .await?;
        info!("Question #{request_id} routed to manager {manager_id}");
        Ok(RouteOutcome::Assigned {
            request_id,
            manager_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::OpenRegistration;
    use crate::storage::{RequestStatus, SqliteStorage, StorageProvider};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn router() -> Result<(Router, ManagerRegistry, RequestStore), DeskError> {
        let storage: Arc<dyn StorageProvider> = Arc::new(SqliteStorage::open_in_memory()?);
        let registry = ManagerRegistry::new(Arc::clone(&storage), Arc::new(OpenRegistration));
        let requests = RequestStore::new(storage);
        Ok((
            Router::new(registry.clone(), requests.clone()),
            registry,
            requests,
        ))
    }

    #[test]
    fn test_pick_from_empty_set() {
        assert_eq!(pick_manager(&[], &mut rand::rng()), None);
    }

    #[tokio::test]
    async fn test_no_managers_leaves_request_unassigned() -> Result<(), DeskError> {
        let (router, _, requests) = router()?;

        let outcome = router.route(1, "help").await?;
        let RouteOutcome::Unassigned { request_id } = outcome else {
            panic!("expected unassigned, got {outcome:?}");
        };

        let request = requests.get(request_id).await?;
        assert_eq!(request.manager_id, None);
        assert_eq!(request.status, RequestStatus::New);
        Ok(())
    }

    #[tokio::test]
    async fn test_assignment_stays_within_registered_set() -> Result<(), DeskError> {
        let (router, registry, requests) = router()?;
        for id in [10, 20, 30] {
            registry.register(id).await?;
        }

        for _ in 0..50 {
            let outcome = router.route(1, "q").await?;
            let RouteOutcome::Assigned {
                request_id,
                manager_id,
            } = outcome
            else {
                panic!("expected assignment, got {outcome:?}");
            };
            assert!([10, 20, 30].contains(&manager_id));
            assert_eq!(requests.get(request_id).await?.manager_id, Some(manager_id));
        }
        Ok(())
    }

    #[test]
    fn test_selection_is_spread_across_managers() {
        let managers = [1, 2, 3, 4];
        let mut rng = rand::rng();
        let mut hits: HashMap<i64, usize> = HashMap::new();
        let rounds = 4000;

        for _ in 0..rounds {
            if let Some(m) = pick_manager(&managers, &mut rng) {
                *hits.entry(m).or_default() += 1;
            }
        }

        // Expected 1000 each; a fair picker stays far inside this band.
        assert_eq!(hits.len(), managers.len());
        for m in managers {
            let count = hits.get(&m).copied().unwrap_or_default();
            assert!((700..=1300).contains(&count), "manager {m} picked {count} times");
        }
    }
}
