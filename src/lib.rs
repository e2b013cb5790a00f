// Re-export modules for the binary and the integration tests
pub mod api;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod models;
pub mod relay;
pub mod storage;
pub mod validation;

// Re-export main types for convenience
pub use api::{SessionFilter, SupportApi, SupportBackend};
pub use error::{ApiError, ApiResult};
pub use models::*;
