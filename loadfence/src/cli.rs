use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// loadfence - load units inside a dependency containment boundary
#[derive(Parser, Debug)]
#[command(name = "loadfence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load an entry manifest and print what it exports
    Run {
        /// Entry identifier, resolved from the working directory (e.g. ./app/index)
        #[arg(value_name = "ENTRY")]
        entry: String,

        /// Containment root (default: from env or the entry's directory)
        #[arg(long, value_name = "DIR")]
        root: Option<String>,

        /// Identifiers rejected outright, comma separated (added to LOADFENCE_BLACKLIST)
        #[arg(long, value_delimiter = ',', value_name = "IDS")]
        blacklist: Vec<String>,

        /// Identifiers always permitted, even when blacklisted or outside root
        #[arg(long, value_delimiter = ',', value_name = "IDS")]
        allow: Vec<String>,

        /// Reject every identifier starting with one of these prefixes
        #[arg(long, value_delimiter = ',', value_name = "PREFIXES")]
        deny_prefix: Vec<String>,

        /// Substitute an identifier with a contained unit: NAME=./path
        #[arg(long, value_name = "NAME=PATH")]
        alias: Vec<String>,

        /// Directory searched for bare names (repeatable, after LOADFENCE_MODULE_PATHS)
        #[arg(long, value_name = "DIR")]
        module_path: Vec<PathBuf>,

        /// In-memory bare module: NAME=JSON
        #[arg(long, value_name = "NAME=JSON")]
        builtin: Vec<String>,

        /// Maximum nesting depth (default: from env or 64)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Evaluate policy for one identifier without loading anything
    Check {
        /// Entry identifier the boundary is built for
        #[arg(value_name = "ENTRY")]
        entry: String,

        /// Identifier to evaluate
        #[arg(value_name = "IDENTIFIER")]
        identifier: String,

        /// Requesting unit file, relative to the working directory (default: the entry)
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Containment root (default: from env or the entry's directory)
        #[arg(long, value_name = "DIR")]
        root: Option<String>,

        /// Identifiers rejected outright, comma separated
        #[arg(long, value_delimiter = ',', value_name = "IDS")]
        blacklist: Vec<String>,

        /// Identifiers always permitted
        #[arg(long, value_delimiter = ',', value_name = "IDS")]
        allow: Vec<String>,

        /// Reject every identifier starting with one of these prefixes
        #[arg(long, value_delimiter = ',', value_name = "PREFIXES")]
        deny_prefix: Vec<String>,

        /// Output JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}
