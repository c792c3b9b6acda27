use fintrack_core::CategoryService;
use fintrack_domain::{Category, CategoryDraft, CategoryPatch, Entity, EntryKind, ParseKindError};

use crate::cli::core::{
    display_id, required, store_failure, take_force_flag, CommandError, CommandResult,
    ShellContext,
};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "categories",
            "List categories",
            "categories [--force]",
            cmd_categories,
        ),
        CommandEntry::new(
            "add-category",
            "Create a category",
            "add-category <name> <income|expense> [color] [icon]",
            cmd_add_category,
        ),
        CommandEntry::new(
            "rename-category",
            "Rename a category",
            "rename-category <id> <name>",
            cmd_rename_category,
        ),
    ]
}

fn cmd_categories(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (force, _) = take_force_flag(args);
    let store = context.app.categories().clone();
    let categories = context.load_items(&store, force);

    output_section("Categories");
    if categories.is_empty() {
        io::print_info("No categories.");
        return Ok(());
    }
    for category in &categories {
        io::print_info(format!(
            "  {:<38} {}",
            display_id(category.id.as_deref()),
            category.display_label()
        ));
    }
    Ok(())
}

fn cmd_add_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "add-category <name> <income|expense> [color] [icon]";
    let name = required(args, 0, USAGE)?;
    let kind: EntryKind = required(args, 1, USAGE)?
        .parse()
        .map_err(|err: ParseKindError| CommandError::InvalidArguments(err.0))?;

    let mut draft = CategoryDraft::new(name, kind);
    if let Some(color) = args.get(2) {
        draft = draft.with_color(*color);
    }
    if let Some(icon) = args.get(3) {
        draft = draft.with_icon(*icon);
    }

    let store = context.app.categories().clone();
    let created = context
        .block_on(store.create(draft))
        .map_err(|err| store_failure(&store, err))?;
    io::print_success(format!(
        "Category `{}` created ({}).",
        created.name,
        display_id(created.id.as_deref())
    ));
    Ok(())
}

fn cmd_rename_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "rename-category <id> <name>";
    let id = required(args, 0, USAGE)?;
    let name = required(args, 1, USAGE)?;

    let store = context.app.categories().clone();
    context.load_items(&store, false);
    let updated = context
        .block_on(store.update(id, CategoryPatch::rename(name)))
        .map_err(|err| store_failure(&store, err))?;
    io::print_success(format!("Category renamed to `{}`.", updated.name));
    Ok(())
}

/// Finds a category by id or (case-insensitive) name among the cached categories.
pub(crate) fn resolve_category(
    context: &ShellContext,
    reference: &str,
) -> Result<Category, CommandError> {
    let store = context.app.categories().clone();
    let categories = context.load_items(&store, false);
    categories
        .iter()
        .find(|category| category.has_id(reference))
        .or_else(|| CategoryService::find_by_name(&categories, reference))
        .cloned()
        .ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "unknown category `{}` (use `categories` to list them)",
                reference
            ))
        })
}
