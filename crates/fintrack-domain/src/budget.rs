//! Domain types representing spending budgets.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

/// A spending limit for one category over a recurring period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Budget {
    pub fn spent_or_zero(&self) -> f64 {
        self.spent.unwrap_or(0.0)
    }

    /// Share of the limit already spent, in percent. `None` when the limit is not positive.
    pub fn percentage_used(&self) -> Option<f64> {
        if self.amount <= 0.0 {
            return None;
        }
        Some(self.spent_or_zero() / self.amount * 100.0)
    }
}

impl Entity for Budget {
    type Draft = BudgetDraft;
    type Patch = BudgetPatch;

    const RESOURCE: &'static str = "budgets";
    const LABEL: &'static str = "budget";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn from_draft(draft: BudgetDraft) -> Self {
        Self {
            id: None,
            category_id: draft.category_id,
            category_name: draft.category_name,
            amount: draft.amount,
            period: draft.period,
            start_date: draft.start_date,
            end_date: draft.end_date,
            spent: draft.spent,
            remaining: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn apply_patch(&mut self, patch: &BudgetPatch) {
        if let Some(category_id) = &patch.category_id {
            self.category_id = category_id.clone();
        }
        if let Some(category_name) = &patch.category_name {
            self.category_name = Some(category_name.clone());
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(period) = patch.period {
            self.period = period;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(spent) = patch.spent {
            self.spent = Some(spent);
        }
        if self.spent.is_some() {
            self.remaining = Some(self.amount - self.spent_or_zero());
        }
    }
}

/// Fields submitted when creating a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDraft {
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<f64>,
}

impl BudgetDraft {
    pub fn new(
        category_id: impl Into<String>,
        amount: f64,
        period: BudgetPeriod,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            category_name: None,
            amount,
            period,
            start_date,
            end_date: None,
            spent: None,
        }
    }

    pub fn with_category_name(mut self, name: impl Into<String>) -> Self {
        self.category_name = Some(name.into());
        self
    }

    pub fn with_spent(mut self, spent: f64) -> Self {
        self.spent = Some(spent);
        self
    }
}

/// Partial budget update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<f64>,
}

impl BudgetPatch {
    pub fn amount(amount: f64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn spent(spent: f64) -> Self {
        Self {
            spent: Some(spent),
            ..Self::default()
        }
    }
}

/// Recurrence of a budget limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Monthly,
    Yearly,
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        };
        f.write_str(label)
    }
}

impl FromStr for BudgetPeriod {
    type Err = ParseKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(BudgetPeriod::Monthly),
            "yearly" | "year" | "annual" => Ok(BudgetPeriod::Yearly),
            other => Err(ParseKindError(format!(
                "unknown budget period `{other}` (expected monthly or yearly)"
            ))),
        }
    }
}
