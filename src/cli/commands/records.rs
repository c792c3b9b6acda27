//! Resource-generic commands that work on any of the three collections.

use fintrack_core::EntityStore;
use fintrack_domain::Entity;

use crate::cli::core::{required, store_failure, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;

/// Collection names accepted by `show` and `delete`.
pub const RESOURCE_NAMES: [&str; 3] = ["budgets", "categories", "transactions"];

const SHOW_USAGE: &str = "show <budgets|categories|transactions> <id>";
const DELETE_USAGE: &str = "delete <budgets|categories|transactions> <id>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "show",
            "Fetch one record from the backend and print it as JSON",
            SHOW_USAGE,
            cmd_show,
        ),
        CommandEntry::new("delete", "Delete a record", DELETE_USAGE, cmd_delete),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Budgets,
    Categories,
    Transactions,
}

impl Resource {
    fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "budgets" | "budget" => Some(Resource::Budgets),
            "categories" | "category" => Some(Resource::Categories),
            "transactions" | "transaction" => Some(Resource::Transactions),
            _ => None,
        }
    }
}

fn resource_arg(args: &[&str], usage: &str) -> Result<Resource, CommandError> {
    let raw = required(args, 0, usage)?;
    Resource::parse(raw).ok_or_else(|| {
        CommandError::InvalidArguments(format!(
            "unknown resource `{}` (expected one of {})",
            raw,
            RESOURCE_NAMES.join(", ")
        ))
    })
}

fn cmd_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let resource = resource_arg(args, SHOW_USAGE)?;
    let id = args.get(1).copied().unwrap_or_default();
    match resource {
        Resource::Budgets => show_record(context, context.app.budgets().store(), id),
        Resource::Categories => show_record(context, context.app.categories(), id),
        Resource::Transactions => show_record(context, context.app.transactions(), id),
    }
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let resource = resource_arg(args, DELETE_USAGE)?;
    let id = args.get(1).copied().unwrap_or_default();
    match resource {
        Resource::Budgets => delete_record(context, context.app.budgets().store(), id),
        Resource::Categories => delete_record(context, context.app.categories(), id),
        Resource::Transactions => delete_record(context, context.app.transactions(), id),
    }
}

// `get` leaves the cached list untouched.
fn show_record<T: Entity>(
    context: &ShellContext,
    store: &EntityStore<T>,
    id: &str,
) -> CommandResult {
    let record = context
        .block_on(store.get(id))
        .map_err(|err| store_failure(store, err))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

// Blank ids are rejected by the store itself, with its own message.
fn delete_record<T: Entity>(
    context: &ShellContext,
    store: &EntityStore<T>,
    id: &str,
) -> CommandResult {
    context
        .block_on(store.delete(id))
        .map_err(|err| store_failure(store, err))?;
    io::print_success(format!("Deleted {} {}.", T::LABEL, id));
    Ok(())
}
