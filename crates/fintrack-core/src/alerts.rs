use std::sync::{PoisonError, RwLock};

use fintrack_domain::{AlertSeverity, Budget, BudgetAlert};

use crate::DerivedView;

/// Spend share (percent) at which a budget starts alerting.
pub const WARNING_THRESHOLD: f64 = 80.0;
/// Spend share (percent) at which an alert becomes a danger alert.
pub const DANGER_THRESHOLD: f64 = 100.0;

const UNKNOWN_CATEGORY: &str = "Unknown";

/// One alert per budget whose spend reached the warning threshold.
/// Budgets with a non-positive limit are skipped.
pub fn derive_alerts(budgets: &[Budget]) -> Vec<BudgetAlert> {
    budgets
        .iter()
        .filter_map(|budget| {
            let percentage = budget.percentage_used()?;
            if percentage < WARNING_THRESHOLD {
                return None;
            }
            let severity = if percentage >= DANGER_THRESHOLD {
                AlertSeverity::Danger
            } else {
                AlertSeverity::Warning
            };
            Some(BudgetAlert {
                category_id: budget.category_id.clone(),
                category_name: budget
                    .category_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
                budget_amount: budget.amount,
                spent: budget.spent_or_zero(),
                percentage,
                severity,
            })
        })
        .collect()
}

/// Current alert list of a budget store, fully recomputed on every change.
#[derive(Debug, Default)]
pub struct AlertBook {
    alerts: RwLock<Vec<BudgetAlert>>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<BudgetAlert> {
        self.alerts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DerivedView<Budget> for AlertBook {
    fn recompute(&self, items: &[Budget]) {
        let next = derive_alerts(items);
        *self.alerts.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
