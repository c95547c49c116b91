//! Schemawalk CLI
//!
//! Command-line interface for checking schemas and validating instances.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use schemawalk::{
    lint, load_json, source_to_reference, validate_with, FileStatus, JsonRef, ResolveError,
    SchemaRegistry, Severity,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemawalk")]
#[command(about = "Resolve JSON Schema references and validate instances")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an instance document against a schema
    Validate {
        /// Instance file to validate
        instance: PathBuf,

        /// Schema source: file path or URL, optionally with a #fragment
        #[arg(long, short)]
        schema: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Load a schema and report syntax problems
    Check {
        /// Schema source: file path or URL
        schema: String,
    },

    /// Lint schema files for errors (JSON syntax, schema syntax, broken refs)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            instance,
            schema,
            json,
        } => run_validate(&instance, &schema, json),
        Commands::Check { schema } => run_check(&schema),
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Registry used by the CLI: the library defaults plus `https`, which the
/// library leaves to callers.
fn registry() -> SchemaRegistry {
    let builder = SchemaRegistry::builder();
    #[cfg(feature = "remote")]
    let builder = builder.with_fetcher("https", schemawalk::HttpFetcher::default());
    builder.build()
}

/// Turn a schema source into a reference, keeping any `#fragment`.
fn schema_reference(source: &str) -> Result<JsonRef, u8> {
    let (document, fragment) = match source.find('#') {
        Some(idx) => source.split_at(idx),
        None => (source, ""),
    };
    let locator = source_to_reference(document).map_err(|e| {
        eprintln!("Error: {}", e);
        3u8
    })?;
    if fragment.is_empty() {
        return Ok(locator);
    }
    let fragment = JsonRef::from_string(fragment).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(locator.resolve(&fragment))
}

fn run_validate(instance_path: &Path, schema_source: &str, json_output: bool) -> Result<(), u8> {
    let instance = load_json(instance_path).map_err(|e| {
        report_error(json_output, &format!("loading instance: {}", e));
        e.exit_code() as u8
    })?;

    let reference = schema_reference(schema_source)?;
    let registry = registry();

    match validate_with(&registry, &reference, &instance) {
        Ok(report) if report.is_valid() => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Ok(report) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": report.errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in &report.errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_resolve_error(json_output, &e);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_check(schema_source: &str) -> Result<(), u8> {
    let reference = schema_reference(schema_source)?;
    let registry = registry();

    match registry.get_schema(&reference) {
        Ok(node) => {
            for message in registry.syntax().check(node.raw()) {
                eprintln!("  warning: {}", message);
            }
            println!("Schema OK: {}", reference);
            Ok(())
        }
        Err(e) => {
            report_resolve_error(false, &e);
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn report_resolve_error(json_output: bool, error: &ResolveError) {
    let ResolveError::Syntax { messages, .. } = error else {
        report_error(json_output, &error.to_string());
        return;
    };

    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "error": error.to_string(),
            "syntax": messages
        });
        println!("{}", output);
    } else {
        eprintln!("Error: {}", error);
        for message in messages.iter().filter(|m| m.is_fatal()) {
            eprintln!("  {}", message);
        }
        for message in messages.iter().filter(|m| !m.is_fatal()) {
            eprintln!("  warning: {}", message);
        }
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
