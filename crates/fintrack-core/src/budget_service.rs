//! Budget facade: an entity store with alert derivation attached.

use std::sync::Arc;

use fintrack_domain::{Budget, BudgetAlert, BudgetPatch};

use crate::{
    AlertBook, ApiResult, AuthProvider, Backend, DerivedView, EntityStore, InsertPosition,
    StoreProfile,
};

/// Budgets are reference data: new budgets are appended.
pub struct BudgetService {
    store: EntityStore<Budget>,
    alerts: Arc<AlertBook>,
}

impl BudgetService {
    pub fn profile() -> StoreProfile {
        StoreProfile::for_entity::<Budget>(InsertPosition::Append)
    }

    pub fn new(backend: Arc<dyn Backend<Budget>>, auth: Arc<dyn AuthProvider>) -> Self {
        let alerts = Arc::new(AlertBook::new());
        let view: Arc<dyn DerivedView<Budget>> = alerts.clone();
        let store = EntityStore::with_views(Self::profile(), backend, auth, vec![view]);
        Self { store, alerts }
    }

    pub fn store(&self) -> &EntityStore<Budget> {
        &self.store
    }

    /// Alerts derived from the budgets as of the last successful change.
    pub fn alerts(&self) -> Vec<BudgetAlert> {
        self.alerts.alerts()
    }

    /// Records the amount spent so far against a budget.
    pub async fn record_spent(&self, id: &str, spent: f64) -> ApiResult<Budget> {
        self.store.update(id, BudgetPatch::spent(spent)).await
    }
}
