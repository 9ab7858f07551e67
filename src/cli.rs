use std::path::PathBuf;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reconcile forever.
    Run,
    /// Reconcile lists, run one pass, exit.
    Once,
    /// Reconcile lists only.
    Lists,
    Help,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
}

/// Parse arguments (without the program name).
///
/// Supported forms:
///   gitrello
///   gitrello run|once|lists|help
///   gitrello once --config ./gitrello.toml -v
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut command: Option<Command> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = Some(PathBuf::from(path)),
                    None => bail!("Missing value for -c/--config flag"),
                }
            }
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" | "help" => command = Some(Command::Help),
            "run" | "once" | "lists" => {
                if command.is_some() {
                    bail!("Unexpected extra command '{}'", args[i]);
                }
                command = Some(match args[i].as_str() {
                    "run" => Command::Run,
                    "once" => Command::Once,
                    _ => Command::Lists,
                });
            }
            other => bail!("Unknown argument '{other}'. Run `gitrello help` for usage."),
        }
        i += 1;
    }

    Ok(CliArgs {
        command: command.unwrap_or(Command::Run),
        config_path,
        verbose,
    })
}

pub fn print_help() {
    println!("gitrello — mirror GitHub searches onto Trello lists\n");
    println!("USAGE:");
    println!("  gitrello [run]    Reconcile the board every sync interval until stopped");
    println!("  gitrello once     Reconcile lists, run a single sync pass, then exit");
    println!("  gitrello lists    Create missing lists and close unconfigured ones");
    println!();
    println!("OPTIONS:");
    println!("  -c, --config <path>  Config file (default: $GITRELLO_CONFIG or ~/.config/gitrello/config.toml)");
    println!("  -v, --verbose        Debug logging (RUST_LOG overrides)");
    println!();
    println!("ENVIRONMENT:");
    println!("  GITRELLO_APPKEY, GITRELLO_TRELLO_TOKEN, GITRELLO_BOARDID");
    println!("  GITRELLO_SYNC_TIMEOUT (seconds), GITRELLO_WORKERS, GITRELLO_GITHUB_TOKEN");
}
