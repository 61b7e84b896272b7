//! apibind CLI
//!
//! Compiles OpenAPI documents into typed Rust API clients.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use apibind_gen::config::GeneratorConfig;
use apibind_gen::driver::{discover_documents, dump_document, generate_all, write_units};
use apibind_gen::errors::{Diagnostic, GeneratorError};
use apibind_gen::manifest::write_manifest;
use apibind_gen::output::Generator;

/// apibind - compiles OpenAPI documents into typed Rust clients
#[derive(Parser, Debug)]
#[command(name = "apibind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Documents or directories to search for `*swagger.json` / `*openapi.json`
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for generated code
    #[arg(short, long, default_value = "generated/src")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Module path holding the generated modules (e.g. `crate::apis`)
    #[arg(long)]
    base_module: Option<String>,

    /// Visibility of generated types (e.g. `pub(crate)`)
    #[arg(long)]
    type_visibility: Option<String>,

    /// Visibility of generated fields and methods
    #[arg(long)]
    member_visibility: Option<String>,

    /// Indent unit of generated code
    #[arg(long)]
    indent: Option<String>,

    /// Package name for the generated Cargo.toml
    #[arg(long)]
    crate_name: Option<String>,

    /// Also write Cargo.toml next to the output directory
    #[arg(long)]
    manifest: bool,

    /// Print generated code without writing files
    #[arg(long)]
    dry_run: bool,

    /// Print the parsed intermediate representation as JSON instead of
    /// generating code
    #[arg(long)]
    dump_ir: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(diagnostics) if diagnostics.is_empty() => ExitCode::SUCCESS,
        Ok(diagnostics) => {
            for diagnostic in &diagnostics {
                report(diagnostic);
            }
            eprintln!(
                "{}",
                format!("{} document(s) failed to generate", diagnostics.len()).red().bold()
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            report(&Diagnostic::new("apibind", &err));
            ExitCode::FAILURE
        }
    }
}

/// Level comes from `RUST_LOG` when set, otherwise from `-v` counts.
fn init_tracing(verbose: u8) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<Vec<Diagnostic>, GeneratorError> {
    let documents = discover_documents(&cli.inputs)?;
    if documents.is_empty() {
        return Err(GeneratorError::ConfigError(
            "No documents found. Expected files named *swagger.json or *openapi.json.".to_string(),
        ));
    }

    if cli.dump_ir {
        for document in &documents {
            println!("=== {} ===\n{}\n", document.display(), dump_document(document)?);
        }
        return Ok(Vec::new());
    }

    let generator = Generator::new(load_config(cli)?)?;
    debug!(documents = documents.len(), output = %cli.output.display(), "Generating");

    let generation = generate_all(&generator, &documents);
    write_units(&generation.units, &cli.output, cli.dry_run)?;

    if cli.manifest && !generation.modules.is_empty() {
        let crate_dir = cli.output.parent().unwrap_or(Path::new("."));
        write_manifest(crate_dir, &generator.config().crate_name, cli.dry_run)?;
    }

    if !cli.dry_run && !generation.modules.is_empty() {
        eprintln!(
            "{} {} module(s) to {}",
            "Generated".green().bold(),
            generation.modules.len(),
            cli.output.display()
        );
    }

    Ok(generation.diagnostics)
}

/// Reads `--config` when given, then applies flag overrides.
fn load_config(cli: &Cli) -> Result<GeneratorConfig, GeneratorError> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    let overrides = [
        (&cli.base_module, &mut config.base_module),
        (&cli.type_visibility, &mut config.type_visibility),
        (&cli.member_visibility, &mut config.member_visibility),
        (&cli.indent, &mut config.indent),
        (&cli.crate_name, &mut config.crate_name),
    ];
    for (flag, field) in overrides {
        if let Some(value) = flag {
            *field = value.clone();
        }
    }
    Ok(config)
}

fn report(diagnostic: &Diagnostic) {
    eprintln!(
        "{}: {}: {}",
        format!("error[{}]", diagnostic.code).red().bold(),
        diagnostic.document.bold(),
        diagnostic.message
    );
}
