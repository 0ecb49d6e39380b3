mod cli;
mod commands;
mod middleware;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::check::CheckRequest;
use commands::run::RunRequest;

fn main() -> Result<()> {
    loadfence_core::observability::init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run {
            entry,
            root,
            blacklist,
            allow,
            deny_prefix,
            alias,
            module_path,
            builtin,
            max_depth,
            json,
        } => commands::run::run_entry(RunRequest {
            entry,
            root,
            blacklist,
            allow,
            deny_prefix,
            alias,
            module_path,
            builtin,
            max_depth,
            json,
        })?,
        Commands::Check {
            entry,
            identifier,
            from,
            root,
            blacklist,
            allow,
            deny_prefix,
            json,
        } => commands::check::check_identifier(CheckRequest {
            entry,
            identifier,
            from,
            root,
            blacklist,
            allow,
            deny_prefix,
            json,
        })?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
