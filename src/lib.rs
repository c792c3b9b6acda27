#![doc(test(attr(deny(warnings))))]

//! fintrack is a terminal client for a personal finance service. It keeps budgets,
//! categories and transactions cached in memory, in sync with a REST API or local
//! JSON files, and derives budget alerts and dashboard summaries from them.

pub mod app;
pub mod cli;
pub mod errors;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("fintrack tracing initialized.");
    });
}
