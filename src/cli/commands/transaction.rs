use chrono::Local;
use fintrack_core::{CategoryService, TransactionService};
use fintrack_domain::{EntryKind, ParseKindError, TransactionDraft};

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
            "transactions",
            "List transactions, newest first",
            "transactions [--force] [category]",
            cmd_transactions,
        ),
        CommandEntry::new(
            "add-transaction",
            "Record an income or expense",
            "add-transaction <title> <amount> <income|expense> <category> [date YYYY-MM-DD] [description]",
            cmd_add_transaction,
        ),
    ]
}

fn cmd_transactions(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (force, rest) = take_force_flag(args);
    let store = context.app.transactions().clone();
    let mut transactions = context.load_items(&store, force);

    if let Some(reference) = rest.first() {
        let category = resolve_category(context, reference)?;
        let category_id = category.id.unwrap_or_default();
        transactions = TransactionService::for_category(&transactions, &category_id)
            .into_iter()
            .cloned()
            .collect();
    }

    let names = CategoryService::names_by_id(&context.app.categories().items());

    output_section("Transactions");
    if transactions.is_empty() {
        io::print_info("No transactions.");
        return Ok(());
    }
    for transaction in &transactions {
        let sign = match transaction.kind {
            EntryKind::Income => "+",
            EntryKind::Expense => "-",
        };
        let category = transaction
            .category_name
            .clone()
            .or_else(|| names.get(&transaction.category_id).cloned())
            .unwrap_or_else(|| "Other".to_string());
        io::print_info(format!(
            "  {:<38} {} {:<24} {}{:>14} [{}]",
            display_id(transaction.id.as_deref()),
            transaction.date,
            transaction.title,
            sign,
            context.money(transaction.amount),
            category
        ));
    }
    Ok(())
}

fn cmd_add_transaction(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "add-transaction <title> <amount> <income|expense> <category> [date YYYY-MM-DD] [description]";
    let title = required(args, 0, USAGE)?;
    let amount = parse_amount(required(args, 1, USAGE)?)?;
    let kind: EntryKind = required(args, 2, USAGE)?
        .parse()
        .map_err(|err: ParseKindError| CommandError::InvalidArguments(err.0))?;
    let category = resolve_category(context, required(args, 3, USAGE)?)?;
    let date = match args.get(4) {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let category_id = category.id.clone().ok_or_else(|| {
        CommandError::Message(format!("category `{}` has no id yet", category.name))
    })?;

    let mut draft = TransactionDraft::new(title, amount, kind, category_id, date);
    if let Some(description) = args.get(5) {
        draft = draft.with_description(*description);
    }

    let store = context.app.transactions().clone();
    let created = context
        .block_on(store.create(draft))
        .map_err(|err| store_failure(&store, err))?;
    io::print_success(format!(
        "Recorded `{}` ({}) in `{}`.",
        created.title,
        context.money(created.amount),
        category.name
    ));
    Ok(())
}
