pub mod budget;
pub mod category;
pub mod config;
pub mod records;
pub mod session;
pub mod summary;
pub mod system;
pub mod transaction;

use crate::cli::registry::{CommandEntry, CommandRegistry};

pub(crate) fn all_definitions() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(system::definitions());
    commands.extend(session::definitions());
    commands.extend(budget::definitions());
    commands.extend(category::definitions());
    commands.extend(transaction::definitions());
    commands.extend(summary::definitions());
    commands.extend(records::definitions());
    commands.extend(config::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    for entry in all_definitions() {
        registry.register(entry);
    }
}
