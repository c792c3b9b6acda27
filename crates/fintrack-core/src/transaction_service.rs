use std::sync::Arc;

use fintrack_domain::Transaction;

use crate::{AuthProvider, Backend, EntityStore, InsertPosition, StoreProfile};

/// Transaction facade. The log is newest-first, so new transactions are prepended.
pub struct TransactionService;

impl TransactionService {
    pub fn profile() -> StoreProfile {
        StoreProfile::for_entity::<Transaction>(InsertPosition::Prepend)
    }

    pub fn open(
        backend: Arc<dyn Backend<Transaction>>,
        auth: Arc<dyn AuthProvider>,
    ) -> EntityStore<Transaction> {
        EntityStore::new(Self::profile(), backend, auth)
    }

    pub fn for_category<'a>(
        transactions: &'a [Transaction],
        category_id: &str,
    ) -> Vec<&'a Transaction> {
        transactions
            .iter()
            .filter(|txn| txn.category_id == category_id)
            .collect()
    }
}
