//! Manager registry and registration gating.

use crate::error::DeskError;
use crate::storage::StorageProvider;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Decides who may register themselves as a manager
pub trait RegistrationGate: Send + Sync {
    /// Whether `user_id` is allowed to become a manager
    fn may_register(&self, user_id: i64) -> bool;
}

/// Anyone may register (bootstrap mode)
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRegistration;

impl RegistrationGate for OpenRegistration {
    fn may_register(&self, _user_id: i64) -> bool {
        true
    }
}

/// Only listed administrators may register
#[derive(Debug, Clone, Default)]
pub struct AdminRegistration {
    admins: HashSet<i64>,
}

impl AdminRegistration {
    /// Gate that admits exactly `admins`
    #[must_use]
    pub const fn new(admins: HashSet<i64>) -> Self {
        Self { admins }
    }
}

impl RegistrationGate for AdminRegistration {
    fn may_register(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }
}

/// Set of users allowed to act as managers
///
/// Always reads through to storage so role checks reflect the latest state.
#[derive(Clone)]
pub struct ManagerRegistry {
    storage: Arc<dyn StorageProvider>,
    gate: Arc<dyn RegistrationGate>,
}

impl ManagerRegistry {
    /// Create a registry over `storage` guarded by `gate`
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>, gate: Arc<dyn RegistrationGate>) -> Self {
        Self { storage, gate }
    }

    /// Register `user_id` as a manager.
    ///
    /// Returns `true` when a new manager was added and `false` for a repeated
    /// registration, which is not an error.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the gate rejects the user, `StorageUnavailable` on storage failure.
    pub async fn register(&self, user_id: i64) -> Result<bool, DeskError> {
        if !self.gate.may_register(user_id) {
            warn!("User {user_id} was refused manager registration.");
            return Err(DeskError::Forbidden(format!(
                "user {user_id} may not register as manager"
            )));
        }
        let added = self.storage.register_manager(user_id).await?;
        if added {
            info!("Manager added: {user_id}");
        }
        Ok(added)
    }

    /// Whether `user_id` is a registered manager
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` on storage failure.
    pub async fn is_manager(&self, user_id: i64) -> Result<bool, DeskError> {
        Ok(self.storage.is_manager(user_id).await?)
    }

    /// All registered managers
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` on storage failure.
    pub async fn all_managers(&self) -> Result<BTreeSet<i64>, DeskError> {
        Ok(self.storage.list_managers().await?)
    }
}
