use fintrack_config::Config;
use fintrack_core::AuthProvider;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

const USAGE: &str = "config [show|set <key> <value>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change client settings",
        USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        show_config(context);
        return Ok(());
    }

    match args[0].to_lowercase().as_str() {
        "set" => {
            if args.len() < 3 {
                return Err(CommandError::InvalidArguments(format!(
                    "usage: config set <{}> <value>",
                    Config::KEYS.join("|")
                )));
            }
            let key = args[1].to_lowercase();
            let value = args[2..].join(" ");

            let mut updated = context.app.config().clone();
            updated.set(&key, &value)?;
            context.app.apply_config(updated)?;
            io::print_success(format!("Set {} = {}.", key, value.trim()));
            if key == "backend" || key == "api_base_url" || key == "data_dir" {
                io::print_hint("Stores were reopened; cached items were cleared.");
            }
            Ok(())
        }
        _ => Err(CommandError::InvalidArguments(format!("usage: {USAGE}"))),
    }
}

fn show_config(context: &ShellContext) {
    let config = context.app.config();
    output_section("Configuration");
    io::print_info(format!("  api_base_url:         {}", config.api_base_url));
    io::print_info(format!("  backend:              {}", config.backend));
    io::print_info(format!(
        "  data_dir:             {}",
        context.app.data_dir().display()
    ));
    io::print_info(format!(
        "  request_timeout_secs: {}",
        config.request_timeout_secs
    ));
    io::print_info(format!("  currency:             {}", config.currency));
    io::print_info(format!("  locale:               {}", config.locale));
    io::print_info(format!(
        "  config file:          {}",
        context.app.config_manager().config_path().display()
    ));
    let session = if context.app.auth().is_authenticated() {
        "signed in"
    } else {
        "signed out"
    };
    io::print_info(format!("  session:              {session}"));
}
