//! Centralized configuration (environment variables + defaults).

use crate::error::{Result, StoreError};

/// Database used when neither `MONGODB_DATABASE` nor the URI names one.
pub const DEFAULT_DATABASE: &str = "test";

/// Loads `.env` (if present) into the process environment.
pub fn load_dotenv() {
    dotenv::dotenv().ok();
}

/// MongoDB connection string (required).
pub fn mongodb_uri() -> Result<String> {
    match std::env::var("MONGODB_URI") {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        Ok(_) => Err(StoreError::Config("MONGODB_URI is empty".to_string())),
        Err(_) => Err(StoreError::Config("MONGODB_URI must be set".to_string())),
    }
}

/// Explicit database name override (optional).
///
/// When unset, the connection falls back to the database named in the URI
/// path, then to [`DEFAULT_DATABASE`].
pub fn mongodb_database() -> Option<String> {
    std::env::var("MONGODB_DATABASE")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "info".to_string()
}
