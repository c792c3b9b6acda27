use std::fmt;

use serde::{Deserialize, Serialize};

/// Spend-ratio signal derived from a budget. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    pub category_id: String,
    pub category_name: String,
    pub budget_amount: f64,
    pub spent: f64,
    pub percentage: f64,
    pub severity: AlertSeverity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Danger,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Danger => "danger",
        };
        f.write_str(label)
    }
}
