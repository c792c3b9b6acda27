use fintrack_core::SummaryService;

use crate::cli::core::{take_force_flag, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "summary",
        "Dashboard: totals, recent transactions, budget status and top categories",
        "summary [--force]",
        cmd_summary,
    )]
}

fn cmd_summary(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (force, _) = take_force_flag(args);
    let budgets_store = context.app.budgets().store().clone();
    let categories_store = context.app.categories().clone();
    let transactions_store = context.app.transactions().clone();

    let (budgets, categories, transactions) = context.block_on(async {
        tokio::join!(
            budgets_store.load(force),
            categories_store.load(force),
            transactions_store.load(force)
        )
    });
    // First failing store only.
    if let Some(message) = transactions_store
        .error()
        .or_else(|| budgets_store.error())
        .or_else(|| categories_store.error())
    {
        context.print_warning(&message);
    }

    let summary = SummaryService::dashboard(&transactions, &budgets, &categories);

    output_section("Summary");
    io::print_info(format!("  Income:  {}", context.money(summary.total_income)));
    io::print_info(format!("  Expense: {}", context.money(summary.total_expense)));
    io::print_info(format!("  Balance: {}", context.money(summary.balance)));

    output_section("Recent transactions");
    if summary.recent.is_empty() {
        io::print_info("No transactions.");
    }
    for transaction in &summary.recent {
        io::print_info(format!(
            "  {} {:<24} {:>14} ({})",
            transaction.date,
            transaction.title,
            context.money(transaction.amount),
            transaction.kind
        ));
    }

    output_section("Budget status");
    if summary.budget_status.is_empty() {
        io::print_info("No budgets.");
    }
    for row in &summary.budget_status {
        io::print_info(format!(
            "  {:<20} {:>5.1}% of {}",
            row.budget.category_name.as_deref().unwrap_or("Unknown"),
            row.percentage,
            context.money(row.budget.amount)
        ));
    }

    output_section("Spending by category");
    if summary.category_breakdown.is_empty() {
        io::print_info("No expenses.");
    }
    for row in &summary.category_breakdown {
        io::print_info(format!("  {:<20} {:>14}", row.name, context.money(row.amount)));
    }
    Ok(())
}
