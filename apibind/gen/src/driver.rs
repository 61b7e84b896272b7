//! Document discovery and whole-run generation.
//!
//! A run reads every discovered document, generates its units and keeps going
//! when one fails: the failure becomes a [`Diagnostic`] and the remaining
//! documents are still generated. The runtime and root units are added once,
//! after the documents.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::{Diagnostic, GeneratorError};
use crate::naming::UniqueNames;
use crate::output::{GeneratedUnit, Generator, module_name, write_atomic};
use crate::parser::parse_document;

/// File name suffixes recognised as input documents.
const DOCUMENT_SUFFIXES: &[&str] = &["swagger.json", "openapi.json"];

/// Module names taken by the once-per-run units.
const RESERVED_MODULES: &[&str] = &["runtime"];

/// Returns `true` for files named `*swagger.json` or `*openapi.json`.
///
/// ## Examples
///
/// ```
/// use std::path::Path;
/// use apibind_gen::driver::is_document_file;
///
/// assert!(is_document_file(Path::new("specs/petstore.swagger.json")));
/// assert!(is_document_file(Path::new("openapi.json")));
/// assert!(!is_document_file(Path::new("package.json")));
/// ```
pub fn is_document_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| DOCUMENT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

/// Expands the inputs into a sorted list of documents.
///
/// Files are taken as given. Directories are walked recursively and only
/// files accepted by [`is_document_file`] are kept.
///
/// ## Errors
///
/// Returns [`GeneratorError::ReadError`] when an input does not exist or a
/// directory cannot be walked.
pub fn discover_documents(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, GeneratorError> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_file() {
            documents.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            return Err(GeneratorError::ReadError {
                path: input.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            });
        }
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry.map_err(|e| GeneratorError::ReadError {
                path: input.display().to_string(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && is_document_file(entry.path()) {
                documents.push(entry.into_path());
            }
        }
    }
    documents.sort();
    documents.dedup();
    debug!(count = documents.len(), "Discovered documents");
    Ok(documents)
}

/// The outcome of generating a set of documents.
#[derive(Debug, Default)]
pub struct GenerationRun {
    /// Units of every document that generated, then `runtime.rs` and the
    /// root unit.
    pub units: Vec<GeneratedUnit>,
    /// One entry per failed document.
    pub diagnostics: Vec<Diagnostic>,
    /// Module names of the documents that generated, in input order.
    pub modules: Vec<String>,
}

impl GenerationRun {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Generates every document, continuing past failures.
///
/// Module names that collide get a numeric suffix, e.g. `pet_store2`.
pub fn generate_all(generator: &Generator, documents: &[PathBuf]) -> GenerationRun {
    let mut run = GenerationRun::default();
    let mut names = UniqueNames::with_reserved(RESERVED_MODULES.iter().copied());

    for path in documents {
        let document = path.display().to_string();
        match generate_one(generator, path, &document, &names) {
            Ok((module, units)) => {
                debug!(document = %document, module = %module, units = units.len(), "Generated document");
                run.modules.push(names.claim(&module));
                run.units.extend(units);
            }
            Err(err) => run.diagnostics.push(Diagnostic::new(document, &err)),
        }
    }

    if run.modules.is_empty() {
        return run;
    }
    let shared = generator
        .generate_runtime()
        .and_then(|runtime| Ok([runtime, generator.generate_root(&run.modules)?]));
    match shared {
        Ok(units) => run.units.extend(units),
        Err(err) => run.diagnostics.push(Diagnostic::new("runtime.rs", &err)),
    }
    run
}

fn generate_one(
    generator: &Generator,
    path: &Path,
    display: &str,
    names: &UniqueNames,
) -> Result<(String, Vec<GeneratedUnit>), GeneratorError> {
    let text = fs::read_to_string(path).map_err(|source| GeneratorError::ReadError {
        path: display.to_string(),
        source,
    })?;
    let document = parse_document(&text, display)?;
    // Claimed by the caller once the document has generated.
    let module = names.peek(&module_name(&document, display));
    let units = generator.generate_document(&document, &module)?;
    Ok((module, units))
}

/// Writes units below `output_dir`, or prints them when `dry_run` is set.
///
/// ## Errors
///
/// Returns [`GeneratorError::WriteError`] for the first unit that cannot be
/// written.
pub fn write_units(units: &[GeneratedUnit], output_dir: &Path, dry_run: bool) -> Result<(), GeneratorError> {
    for unit in units {
        if dry_run {
            println!("=== {} ===\n{}\n", unit.name, unit.source);
            continue;
        }
        let path = output_dir.join(&unit.name);
        write_atomic(&path, &unit.source)?;
        info!(path = %path.display(), "Wrote unit");
    }
    Ok(())
}

/// Parses a document and renders its intermediate representation as pretty
/// JSON.
///
/// ## Errors
///
/// Returns [`GeneratorError::ReadError`], [`GeneratorError::InvalidJson`] or
/// [`GeneratorError::SchemaFormat`] when the document cannot be parsed.
pub fn dump_document(path: &Path) -> Result<String, GeneratorError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| GeneratorError::ReadError {
        path: display.clone(),
        source,
    })?;
    let document = parse_document(&text, &display)?;
    serde_json::to_string_pretty(&document).map_err(|source| GeneratorError::InvalidJson { path: display, source })
}
