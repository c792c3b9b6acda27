//! Core CLI loop, dispatch, and shell context helpers.

use std::{future::Future, io};

use chrono::NaiveDate;
use fintrack_config::ConfigError;
use fintrack_core::{ApiError, AuthProvider, EntityStore};
use fintrack_domain::Entity;
use strsim::levenshtein;
use tokio::runtime::Builder;

use crate::{app::FinanceApp, errors::CliError, utils::app_base_dir};

use super::commands;
use super::io as cli_io;
use super::output::{self, OutputPreferences};
use super::registry::{CommandEntry, CommandRegistry};
pub use crate::cli::shell_context::{CliMode, ShellContext};

const FORCE_FLAG: &str = "--force";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let app = FinanceApp::open(app_base_dir())?;
        Self::with_app(mode, app)
    }

    pub fn with_app(mode: CliMode, app: FinanceApp) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| CliError::Runtime(err.to_string()))?;

        output::set_preferences(OutputPreferences {
            plain_output: mode == CliMode::Script,
        });

        Ok(Self {
            mode,
            registry,
            app,
            runtime,
            running: true,
        })
    }

    /// Drives a store operation to completion on the shell's runtime.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn prompt(&self) -> String {
        if self.app.auth().is_authenticated() {
            "fintrack> ".to_string()
        } else {
            "fintrack (signed out)> ".to_string()
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let mut suggestions: Vec<_> = self
            .registry
            .names()
            .map(|key| (levenshtein(key, input), key))
            .collect();
        suggestions.sort_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = suggestions.first() {
            if *distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action("Exit shell?", true).map_err(CliError::from)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                self.print_error(&message);
                self.print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            other => {
                self.print_error(&other.to_string());
                Ok(())
            }
        }
    }

    pub(crate) fn print_error(&self, message: &str) {
        cli_io::print_error(message);
    }

    pub(crate) fn print_warning(&self, message: &str) {
        cli_io::print_warning(message);
    }

    pub(crate) fn print_hint(&self, message: &str) {
        cli_io::print_hint(message);
    }

    /// Loads a store, printing the store's message when the fetch failed.
    pub(crate) fn load_items<T: Entity>(&self, store: &EntityStore<T>, force: bool) -> Vec<T> {
        let items = self.block_on(store.load(force));
        if let Some(message) = store.error() {
            self.print_warning(&message);
        }
        items
    }

    pub(crate) fn money(&self, amount: f64) -> String {
        self.app.config().format_money(amount)
    }
}

/// Converts a failed store operation into the message the store recorded for it.
pub(crate) fn store_failure<T: Entity>(store: &EntityStore<T>, err: ApiError) -> CommandError {
    CommandError::Message(store.error().unwrap_or_else(|| err.to_string()))
}

/// Splits a trailing `--force` flag from the remaining arguments.
pub(crate) fn take_force_flag<'a>(args: &[&'a str]) -> (bool, Vec<&'a str>) {
    let force = args.iter().any(|arg| arg.eq_ignore_ascii_case(FORCE_FLAG));
    let rest = args
        .iter()
        .copied()
        .filter(|arg| !arg.eq_ignore_ascii_case(FORCE_FLAG))
        .collect();
    (force, rest)
}

pub(crate) fn required<'a>(
    args: &[&'a str],
    index: usize,
    usage: &str,
) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))
}

pub(crate) fn parse_amount(input: &str) -> Result<f64, CommandError> {
    let amount: f64 = input.trim().parse().map_err(|_| {
        CommandError::InvalidArguments(format!("invalid amount `{}`", input))
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(CommandError::InvalidArguments(format!(
            "amount must be a non-negative number, got `{}`",
            input
        )));
    }
    Ok(amount)
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

pub(crate) fn display_id(id: Option<&str>) -> &str {
    id.unwrap_or("-")
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CliError> for CommandError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Input(message) => CommandError::InvalidArguments(message),
            CliError::Config(inner) => CommandError::Config(inner),
            other => CommandError::Message(other.to_string()),
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

#[cfg(test)]
pub(crate) fn process_script(
    context: &mut ShellContext,
    lines: &[&str],
) -> Result<(), CliError> {
    crate::cli::shell::run_lines(context, lines)
}
