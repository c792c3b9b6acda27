use chrono::Local;
use fintrack_domain::{AlertSeverity, BudgetDraft, BudgetPeriod};

use crate::cli::commands::category::resolve_category;
use crate::cli::core::{
    display_id, parse_amount, parse_date, required, store_failure, take_force_flag,
    CommandError, CommandResult, ShellContext,
};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "budgets",
            "List budgets with their spend",
            "budgets [--force]",
            cmd_budgets,
        ),
        CommandEntry::new(
            "add-budget",
            "Create a budget for a category",
            "add-budget <category> <amount> [monthly|yearly] [start YYYY-MM-DD]",
            cmd_add_budget,
        ),
        CommandEntry::new(
            "set-spent",
            "Record the amount spent against a budget",
            "set-spent <budget-id> <amount>",
            cmd_set_spent,
        ),
        CommandEntry::new(
            "alerts",
            "Show budgets at or above 80% of their limit",
            "alerts [--force]",
            cmd_alerts,
        ),
    ]
}

fn cmd_budgets(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (force, _) = take_force_flag(args);
    let store = context.app.budgets().store().clone();
    let budgets = context.load_items(&store, force);

    output_section("Budgets");
    if budgets.is_empty() {
        io::print_info("No budgets.");
        return Ok(());
    }
    for budget in &budgets {
        let usage = budget
            .percentage_used()
            .map(|pct| format!("{pct:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        io::print_info(format!(
            "  {:<38} {:<16} {:>14} spent {:>14} ({}, {})",
            display_id(budget.id.as_deref()),
            budget.category_name.as_deref().unwrap_or("Unknown"),
            context.money(budget.amount),
            context.money(budget.spent_or_zero()),
            usage,
            budget.period
        ));
    }
    Ok(())
}

fn cmd_add_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "add-budget <category> <amount> [monthly|yearly] [start YYYY-MM-DD]";
    let category = resolve_category(context, required(args, 0, USAGE)?)?;
    let amount = parse_amount(required(args, 1, USAGE)?)?;
    let period = match args.get(2) {
        Some(raw) => raw
            .parse::<BudgetPeriod>()
            .map_err(|err| CommandError::InvalidArguments(err.0))?,
        None => BudgetPeriod::Monthly,
    };
    let start_date = match args.get(3) {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let category_id = category.id.clone().ok_or_else(|| {
        CommandError::Message(format!("category `{}` has no id yet", category.name))
    })?;

    let draft = BudgetDraft::new(category_id, amount, period, start_date)
        .with_category_name(category.name.clone());
    let store = context.app.budgets().store().clone();
    let created = context
        .block_on(store.create(draft))
        .map_err(|err| store_failure(&store, err))?;
    io::print_success(format!(
        "Budget of {} for `{}` created ({}).",
        context.money(created.amount),
        category.name,
        display_id(created.id.as_deref())
    ));
    Ok(())
}

fn cmd_set_spent(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "set-spent <budget-id> <amount>";
    let id = required(args, 0, USAGE)?;
    let spent = parse_amount(required(args, 1, USAGE)?)?;

    let store = context.app.budgets().store().clone();
    context.load_items(&store, false);
    let updated = context
        .block_on(context.app.budgets().record_spent(id, spent))
        .map_err(|err| store_failure(&store, err))?;
    io::print_success(format!(
        "Spent {} of {}.",
        context.money(updated.spent_or_zero()),
        context.money(updated.amount)
    ));
    print_alerts(context);
    Ok(())
}

fn cmd_alerts(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (force, _) = take_force_flag(args);
    let store = context.app.budgets().store().clone();
    context.load_items(&store, force);

    output_section("Budget alerts");
    if context.app.budgets().alerts().is_empty() {
        io::print_info("All budgets are below 80% of their limit.");
        return Ok(());
    }
    print_alerts(context);
    Ok(())
}

fn print_alerts(context: &ShellContext) {
    for alert in context.app.budgets().alerts() {
        let line = format!(
            "{}: {:.1}% of {} spent ({})",
            alert.category_name,
            alert.percentage,
            context.money(alert.budget_amount),
            context.money(alert.spent)
        );
        match alert.severity {
            AlertSeverity::Danger => io::print_error(format!("[danger] {line}")),
            AlertSeverity::Warning => io::print_warning(format!("[warning] {line}")),
        }
    }
}
