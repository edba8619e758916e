use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Command line of the analyzer binary.
#[derive(Parser, Debug)]
#[command(
    name = "lambda-analyzer",
    version,
    about = "Static analysis of a Node.js Lambda function's sources",
    long_about = "Reads a function's source tree without executing it and prints one JSON \
                  document describing its environment variables, outbound HTTP calls, \
                  dependencies, handler, AWS SDK usage and tests."
)]
pub struct Cli {
    /// Function directory or single source file
    pub path: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Directory name to skip, in addition to the built-in list (repeatable)
    #[arg(long, value_name = "DIR")]
    pub exclude: Vec<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Settings the analysis pipeline runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub root: PathBuf,
    pub exclude: Vec<String>,
    pub pretty: bool,
}

impl AnalyzerConfig {
    /// Build from parsed arguments; fails when no path was given.
    pub fn from_cli(cli: &Cli) -> Result<Self, String> {
        let root = cli.path.clone().ok_or_else(|| "no input path given".to_string())?;
        Ok(Self {
            root,
            exclude: cli.exclude.clone(),
            pretty: cli.pretty,
        })
    }
}

/// Exit status for an argument error: `0` for `--help`/`--version`, else `1`.
pub fn parse_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

impl Cli {
    /// Default log directive when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
