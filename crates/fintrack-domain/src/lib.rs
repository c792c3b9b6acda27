//! fintrack-domain
//!
//! Pure domain records (Budget, Category, Transaction) and the derived BudgetAlert.
//! No I/O, no CLI, no storage. Only data types, drafts, patches and core enums.

pub mod alert;
pub mod budget;
pub mod category;
pub mod common;
pub mod transaction;

pub use alert::*;
pub use budget::*;
pub use category::*;
pub use common::*;
pub use transaction::*;
