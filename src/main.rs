//! `lambda-analyzer`: static analysis of a Node.js Lambda function.
//!
//! Walks the function's sources without executing them and prints one JSON
//! document with the environment variables it reads, the HTTP endpoints it
//! calls, its dependencies, its handler export, its AWS SDK usage and its
//! test files.

mod analyze;
mod config;
mod discover;
mod error;
mod lang;
mod manifest;
mod model;
mod output;
mod parser;
mod project;
mod util;

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{AnalyzerConfig, Cli};
use error::AnalyzerError;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = config::parse_exit_code(&e);
            // Help and usage text go to the stream clap picks.
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = init_logging(cli.log_level(), cli.log_file.as_deref()) {
        eprintln!("lambda-analyzer: {e}");
        std::process::exit(1);
    }

    let config = match AnalyzerConfig::from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("lambda-analyzer: {msg}");
            std::process::exit(1);
        }
    };

    let result = match project::run(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("lambda-analyzer: {e}");
            std::process::exit(1);
        }
    };

    match output::to_json(&result, config.pretty) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("lambda-analyzer: {e}");
            std::process::exit(1);
        }
    }
}

/// Route `tracing` output to stderr or `log_file`; stdout carries the result.
fn init_logging(default_level: &str, log_file: Option<&Path>) -> Result<(), AnalyzerError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| AnalyzerError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
