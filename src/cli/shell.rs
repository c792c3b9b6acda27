//! Line sources for the shell: the rustyline editor when interactive, stdin in scripts.

use std::{
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;

use crate::cli::commands::records::RESOURCE_NAMES;
use crate::cli::core::{CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::info as output_info;
use crate::errors::CliError;

/// Reads commands from stdin instead of a line editor when set.
pub const SCRIPT_ENV: &str = "FINTRACK_CLI_SCRIPT";

/// Commands whose first argument names a resource collection.
const RESOURCE_COMMANDS: [&str; 2] = ["delete", "show"];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    match mode {
        CliMode::Interactive => {
            let mut source = EditorSource::new(context.command_names())?;
            output_info("Type `help` to list commands, `login <token>` to sign in.");
            drive(&mut context, &mut source)
        }
        CliMode::Script => drive(&mut context, &mut ScriptSource::new(io::stdin().lock())),
    }
}

enum Input {
    Line(String),
    Interrupted,
    Closed,
}

trait LineSource {
    fn read(&mut self, prompt: &str) -> Result<Input, CliError>;

    /// Called for every non-blank line before it is dispatched.
    fn remember(&mut self, _line: &str) {}
}

struct EditorSource {
    editor: Editor<CommandHelper, DefaultHistory>,
}

impl EditorSource {
    fn new(commands: Vec<&'static str>) -> Result<Self, CliError> {
        let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(CommandHelper::new(commands)));
        editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
        Ok(Self { editor })
    }
}

impl LineSource for EditorSource {
    fn read(&mut self, prompt: &str) -> Result<Input, CliError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Input::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => {
                output_info("Exiting shell.");
                Ok(Input::Closed)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remember(&mut self, line: &str) {
        // Tokens never reach the history file.
        if !line.to_ascii_lowercase().starts_with("login") {
            self.editor.add_history_entry(line).ok();
        }
    }
}

struct ScriptSource<R> {
    lines: io::Lines<R>,
}

impl<R: BufRead> ScriptSource<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> LineSource for ScriptSource<R> {
    fn read(&mut self, _prompt: &str) -> Result<Input, CliError> {
        match self.lines.next() {
            Some(line) => Ok(Input::Line(line?)),
            None => Ok(Input::Closed),
        }
    }
}

fn drive(context: &mut ShellContext, source: &mut impl LineSource) -> Result<(), CliError> {
    while context.running {
        let raw = match source.read(&context.prompt())? {
            Input::Line(line) => line,
            Input::Interrupted if context.confirm_exit()? => break,
            Input::Interrupted => continue,
            Input::Closed => break,
        };
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        source.remember(line);
        if let Err(err) = handle_line(context, line) {
            context.report_error(err)?;
        }
    }
    Ok(())
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<(), CommandError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            context.print_warning(&err.message);
            return Ok(());
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(());
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    if context.dispatch(&raw.to_lowercase(), raw, &args)? == LoopControl::Exit {
        context.running = false;
    }
    Ok(())
}

/// Feeds `lines` through the same loop the binary runs in script mode.
#[cfg(test)]
pub(crate) fn run_lines(context: &mut ShellContext, lines: &[&str]) -> Result<(), CliError> {
    let text = lines.join("\n");
    drive(context, &mut ScriptSource::new(io::Cursor::new(text)))
}

/// Completes command names, and resource names after `delete`/`show`.
struct CommandHelper {
    commands: Vec<String>,
}

impl CommandHelper {
    fn new(names: Vec<&'static str>) -> Self {
        let mut commands: Vec<String> = names
            .into_iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        commands.sort();
        commands.dedup();
        Self { commands }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<Pair> {
        let pool: Vec<&str> = match words {
            [] => self.commands.iter().map(String::as_str).collect(),
            [command] if RESOURCE_COMMANDS.contains(&command.to_ascii_lowercase().as_str()) => {
                RESOURCE_NAMES.to_vec()
            }
            _ => Vec::new(),
        };
        pool.into_iter()
            .filter(|name| name.starts_with(needle))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect()
    }
}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix.rfind(char::is_whitespace).map_or(0, |idx| idx + 1);
        let words: Vec<&str> = prefix[..start].split_whitespace().collect();
        let needle = prefix[start..].to_ascii_lowercase();
        Ok((start, self.candidates(&words, &needle)))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

impl Helper for CommandHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_line_respects_quotes() {
        let tokens = parse_command_line(r#"add-transaction "Weekly groceries" 42 expense food"#)
            .expect("tokens");
        assert_eq!(
            tokens,
            vec!["add-transaction", "Weekly groceries", "42", "expense", "food"]
        );
        assert!(parse_command_line(r#"add-category "unterminated"#).is_err());
    }

    #[test]
    fn script_source_yields_lines_then_closes() {
        let mut source = ScriptSource::new(io::Cursor::new("help\n\n# note\n"));
        let mut lines = Vec::new();
        while let Input::Line(line) = source.read("").expect("read") {
            lines.push(line);
        }
        assert_eq!(lines, vec!["help", "", "# note"]);
    }

    #[test]
    fn helper_completes_commands_then_resources() {
        let helper = CommandHelper::new(vec!["delete", "budgets", "categories"]);

        let names: Vec<String> = helper
            .candidates(&[], "b")
            .into_iter()
            .map(|pair| pair.replacement)
            .collect();
        assert_eq!(names, vec!["budgets"]);

        let names: Vec<String> = helper
            .candidates(&["delete"], "tr")
            .into_iter()
            .map(|pair| pair.replacement)
            .collect();
        assert_eq!(names, vec!["transactions"]);

        assert!(helper.candidates(&["budgets"], "").is_empty());
    }
}
