//! Testing helpers and mock utilities.
//!
//! Provides constructors for mocked storage providers.

use crate::storage::{MockStorageProvider, StorageError};

/// Create a mock storage provider where every call fails.
///
/// Useful for asserting that handlers degrade to the generic retry notice
/// instead of panicking or leaking internal errors.
#[must_use]
pub fn mock_storage_failing() -> MockStorageProvider {
    let mut mock = MockStorageProvider::new();

    mock.expect_seed_faq().returning(|_| Err(StorageError::Poisoned));
    mock.expect_load_faq().returning(|| Err(StorageError::Poisoned));
    mock.expect_register_manager().returning(|_| Err(StorageError::Poisoned));
    mock.expect_is_manager().returning(|_| Err(StorageError::Poisoned));
    mock.expect_list_managers().returning(|| Err(StorageError::Poisoned));
    mock.expect_create_request().returning(|_| Err(StorageError::Poisoned));
    mock.expect_get_request().returning(|_| Err(StorageError::Poisoned));
    mock.expect_resolve_request().returning(|_, _, _| Err(StorageError::Poisoned));
    mock.expect_pending_for_manager().returning(|_| Err(StorageError::Poisoned));
    mock.expect_request_stats().returning(|| Err(StorageError::Poisoned));
    mock.expect_load_session().returning(|_| Err(StorageError::Poisoned));
    mock.expect_save_session().returning(|_, _| Err(StorageError::Poisoned));
    mock.expect_check_connection().returning(|| Err("database is locked".to_string()));

    mock
}

/// Create a mock storage provider with an empty, writable state.
///
/// Reads return nothing and writes succeed without persisting.
#[must_use]
pub fn mock_storage_noop() -> MockStorageProvider {
    let mut mock = MockStorageProvider::new();

    mock.expect_is_manager().returning(|_| Ok(false));
    mock.expect_list_managers().returning(|| Ok(Default::default()));
    mock.expect_load_session().returning(|_| Ok(None));
    mock.expect_save_session().returning(|_, _| Ok(()));
    mock.expect_create_request().returning(|_| Ok(1));
    mock.expect_check_connection().returning(|| Ok(()));

    mock
}
