//! Shared test utilities for config module tests.

use std::sync::Mutex;

/// Mutex to serialize environment variable tests and prevent race conditions.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Every environment variable read by `Config::load`.
pub const ENV_VARS: [&str; 7] = [
    "MUISTI_STORAGE_PATH",
    "MUISTI_INDEX_NAME",
    "MUISTI_EMBEDDING_MODEL",
    "MUISTI_SIMILARITY_THRESHOLD",
    "MUISTI_USE_ACCELERATION",
    "MUISTI_EMBEDDING_BATCH_SIZE",
    "MUISTI_WORKER_POOL_SIZE",
];

/// Set an environment variable. Callers must hold `ENV_MUTEX`.
pub fn set_env(key: &str, value: &str) {
    // SAFETY: env-mutating tests are serialized through ENV_MUTEX.
    unsafe { std::env::set_var(key, value) }
}

/// Clean up environment variables used by muisti config.
pub fn cleanup_env_vars() {
    for var in ENV_VARS {
        // SAFETY: env-mutating tests are serialized through ENV_MUTEX.
        unsafe { std::env::remove_var(var) }
    }
}
