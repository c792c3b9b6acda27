//! fintrack-core
//!
//! Client-side cache-and-sync services for fintrack.
//! Depends on fintrack-domain. No CLI, no terminal I/O; persistence goes through the
//! [`Backend`] seam and credentials through [`AuthProvider`].

pub mod alerts;
pub mod auth;
pub mod backend;
pub mod budget_service;
pub mod category_service;
pub mod error;
pub mod store;
pub mod summary_service;
pub mod transaction_service;

pub use alerts::*;
pub use auth::*;
pub use backend::*;
pub use budget_service::*;
pub use category_service::*;
pub use error::{ApiError, ApiResult};
pub use store::*;
pub use summary_service::*;
pub use transaction_service::*;
