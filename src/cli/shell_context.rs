use tokio::runtime::Runtime;

use crate::app::FinanceApp;

use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub app: FinanceApp,
    pub(crate) runtime: Runtime,
    pub running: bool,
}
