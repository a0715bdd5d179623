//! stubschema CLI
//!
//! Validates stub declarations and prints their JSON-Schema tool
//! descriptors.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stubschema_core::{CheckResult, Diagnostic, DocstringStyle, ValidateConfig};
use stubschema_parse::TypeResolver;
use stubschema_tool::{to_json, StubValidator};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stubschema")]
#[command(about = "Validate stub declarations and emit JSON-Schema tool descriptors", long_about = None)]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate declarations and print their descriptors
    Check {
        /// Declaration file, stdin when omitted
        file: Option<PathBuf>,
        /// Docstring dialect: auto, rest, google, numpy or epydoc
        #[arg(short, long)]
        style: Option<DocstringStyle>,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print JSON on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Print the JSON-Schema fragment of one type expression
    Resolve {
        /// Type expression, e.g. `dict[str, list[int]]`
        expr: String,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print JSON on a single line
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli.command)? {
        Ok(json) => {
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Err(diagnostic) => {
            eprintln!("{}", render_diagnostic(&diagnostic));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("stubschema=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run a command. The outer error covers I/O and configuration, the inner
/// one is the validation outcome.
fn execute(command: &Commands) -> Result<CheckResult<String>> {
    match command {
        Commands::Check {
            file,
            style,
            config,
            compact,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(style) = style {
                config.docstring_style = *style;
            }
            let source = read_source(file.as_deref())?;
            debug!(style = %config.docstring_style, bytes = source.len(), "checking declarations");

            match StubValidator::new(config).validate(&source) {
                Ok(descriptors) => Ok(Ok(to_json(&descriptors, !compact)?)),
                Err(diagnostic) => Ok(Err(diagnostic)),
            }
        }
        Commands::Resolve {
            expr,
            config,
            compact,
        } => {
            let config = load_config(config.as_deref())?;
            match TypeResolver::from_config(&config).resolve_str(expr) {
                Ok(descriptor) => {
                    let json = if *compact {
                        serde_json::to_string(&descriptor)?
                    } else {
                        serde_json::to_string_pretty(&descriptor)?
                    };
                    Ok(Ok(json))
                }
                Err(diagnostic) => Ok(Err(diagnostic)),
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ValidateConfig> {
    let Some(path) = path else {
        return Ok(ValidateConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
    ValidateConfig::from_json(&text)
        .wrap_err_with(|| format!("Invalid config {}", path.display()))
}

fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display())),
        None => std::io::read_to_string(std::io::stdin()).wrap_err("Failed to read stdin"),
    }
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    format!(
        "{}{}: {}",
        style("error").red().bold(),
        style(format!("[{}]", diagnostic.kind)).bold(),
        diagnostic.message
    )
}
