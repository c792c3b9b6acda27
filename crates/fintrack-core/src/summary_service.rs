//! Dashboard aggregates computed from store snapshots.

use std::collections::HashMap;

use fintrack_domain::{Budget, Category, Transaction};

use crate::CategoryService;

const OTHER_CATEGORY: &str = "Other";

/// Spend progress of one budget, capped at 100 percent for display.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetProgress {
    pub budget: Budget,
    pub percentage: f64,
}

/// Expense total for one category name.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySpend {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub recent: Vec<Transaction>,
    pub budget_status: Vec<BudgetProgress>,
    pub category_breakdown: Vec<CategorySpend>,
}

/// Stateless aggregation utilities over store snapshots.
pub struct SummaryService;

impl SummaryService {
    /// Number of rows each dashboard list shows.
    pub const DASHBOARD_ROWS: usize = 5;

    pub fn total_income(transactions: &[Transaction]) -> f64 {
        transactions
            .iter()
            .filter(|txn| txn.is_income())
            .map(|txn| txn.amount)
            .sum()
    }

    pub fn total_expense(transactions: &[Transaction]) -> f64 {
        transactions
            .iter()
            .filter(|txn| txn.is_expense())
            .map(|txn| txn.amount)
            .sum()
    }

    pub fn balance(transactions: &[Transaction]) -> f64 {
        Self::total_income(transactions) - Self::total_expense(transactions)
    }

    /// First `limit` transactions; store order is newest-first.
    pub fn recent(transactions: &[Transaction], limit: usize) -> Vec<Transaction> {
        transactions.iter().take(limit).cloned().collect()
    }

    pub fn budget_status(budgets: &[Budget], limit: usize) -> Vec<BudgetProgress> {
        budgets
            .iter()
            .take(limit)
            .map(|budget| BudgetProgress {
                budget: budget.clone(),
                percentage: if budget.amount == 0.0 {
                    0.0
                } else {
                    (budget.spent_or_zero() / budget.amount * 100.0).min(100.0)
                },
            })
            .collect()
    }

    /// Expense totals grouped by category name, largest first.
    pub fn category_breakdown(
        transactions: &[Transaction],
        categories: &[Category],
        limit: usize,
    ) -> Vec<CategorySpend> {
        let names = CategoryService::names_by_id(categories);
        let mut totals: HashMap<String, f64> = HashMap::new();
        for txn in transactions.iter().filter(|txn| txn.is_expense()) {
            let name = names
                .get(&txn.category_id)
                .cloned()
                .unwrap_or_else(|| OTHER_CATEGORY.to_string());
            *totals.entry(name).or_insert(0.0) += txn.amount;
        }
        let mut rows: Vec<CategorySpend> = totals
            .into_iter()
            .map(|(name, amount)| CategorySpend { name, amount })
            .collect();
        rows.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.truncate(limit);
        rows
    }

    pub fn dashboard(
        transactions: &[Transaction],
        budgets: &[Budget],
        categories: &[Category],
    ) -> DashboardSummary {
        let total_income = Self::total_income(transactions);
        let total_expense = Self::total_expense(transactions);
        DashboardSummary {
            total_income,
            total_expense,
            balance: total_income - total_expense,
            recent: Self::recent(transactions, Self::DASHBOARD_ROWS),
            budget_status: Self::budget_status(budgets, Self::DASHBOARD_ROWS),
            category_breakdown: Self::category_breakdown(
                transactions,
                categories,
                Self::DASHBOARD_ROWS,
            ),
        }
    }
}
