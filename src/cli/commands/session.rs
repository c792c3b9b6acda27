use crate::cli::core::{required, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "login",
            "Store the bearer token used for every request",
            "login <token>",
            cmd_login,
        ),
        CommandEntry::new(
            "logout",
            "Forget the stored token",
            "logout",
            cmd_logout,
        ),
    ]
}

fn cmd_login(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let token = required(args, 0, "login <token>")?;
    context.app.auth().set_token(token)?;
    match context.app.auth().token_file() {
        Some(path) => io::print_success(format!("Signed in. Token saved to {}.", path.display())),
        None => io::print_success("Signed in for this session."),
    }
    Ok(())
}

fn cmd_logout(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.app.auth().clear_token()?;
    io::print_success("Signed out.");
    Ok(())
}
