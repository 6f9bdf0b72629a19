//! `provision` binary entry point: parses CLI arguments and dispatches
//! to the library's command handlers.

use std::sync::Arc;

use clap::{CommandFactory, Parser};

use provision_cli::cli::{Cli, Command};
use provision_cli::{commands, logging};

fn main() {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version are not usage errors.
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 3,
            };
            e.print().ok();
            std::process::exit(code);
        }
    };

    let command_name = match &args.command {
        Command::Run(_) => "run",
        Command::Plan(_) => "plan",
        Command::List(_) => "list",
        Command::Completions(_) => "completions",
        Command::Version => "version",
    };
    logging::init_subscriber(args.verbose, command_name);
    let log = Arc::new(logging::Logger::new(command_name));

    let result = match args.command {
        Command::Run(opts) => commands::run::run(&args.global, &opts, &log),
        Command::Plan(opts) => commands::plan::run(&args.global, &opts, &log),
        Command::List(opts) => commands::list::run(&args.global, &opts, &log),
        Command::Completions(opts) => {
            clap_complete::generate(
                opts.shell,
                &mut Cli::command(),
                "provision",
                &mut std::io::stdout(),
            );
            Ok(0)
        }
        Command::Version => {
            let version = option_env!("PROVISION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("provision {version}");
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Configuration and usage errors abort before anything executes.
            log.error(&format!("{e:#}"));
            std::process::exit(3);
        }
    }
}
