//! `Cargo.toml` generation for the output crate.
//!
//! The manifest lists exactly the crates generated code depends on.

use std::path::Path;

use tracing::info;

use crate::errors::GeneratorError;
use crate::output::write_atomic;

/// Dependencies of generated code as `(name, requirement)` pairs, in manifest
/// order.
pub const GENERATED_DEPENDENCIES: &[(&str, &str)] = &[
    ("chrono", r#"{ version = "0.4", features = ["serde"] }"#),
    ("percent-encoding", r#""2.3""#),
    ("reqwest", r#"{ version = "0.12", features = ["json"] }"#),
    ("serde", r#"{ version = "1.0", features = ["derive"] }"#),
    ("serde_json", r#""1.0""#),
    ("thiserror", r#""2.0""#),
    ("uuid", r#"{ version = "1", features = ["serde"] }"#),
];

/// Renders the manifest of the generated crate.
///
/// ## Examples
///
/// ```
/// use apibind_gen::manifest::generate_manifest;
///
/// let manifest = generate_manifest("petstore-client");
/// assert!(manifest.contains("name = \"petstore-client\""));
/// assert!(manifest.contains("reqwest = "));
/// ```
pub fn generate_manifest(crate_name: &str) -> String {
    let mut manifest = format!(
        "# This file was automatically generated by apibind. Do not edit manually.\n\n\
         [package]\n\
         name = \"{crate_name}\"\n\
         version = \"0.1.0\"\n\
         edition = \"2024\"\n\
         publish = false\n\n\
         [dependencies]\n"
    );
    for (name, requirement) in GENERATED_DEPENDENCIES {
        manifest.push_str(&format!("{name} = {requirement}\n"));
    }
    manifest
}

/// Writes `Cargo.toml` into `crate_dir`, or prints it when `dry_run` is set.
///
/// ## Errors
///
/// Returns [`GeneratorError::WriteError`] if the file cannot be written.
pub fn write_manifest(crate_dir: &Path, crate_name: &str, dry_run: bool) -> Result<(), GeneratorError> {
    let manifest = generate_manifest(crate_name);
    if dry_run {
        println!("=== Cargo.toml ===\n{manifest}\n");
        return Ok(());
    }
    let path = crate_dir.join("Cargo.toml");
    write_atomic(&path, &manifest)?;
    info!(path = %path.display(), "Wrote manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_is_valid_toml() {
        let manifest: toml::Table = toml::from_str(&generate_manifest("api-bindings")).unwrap();
        assert_eq!(manifest["package"]["name"].as_str(), Some("api-bindings"));
        assert_eq!(manifest["package"]["edition"].as_str(), Some("2024"));

        let dependencies = manifest["dependencies"].as_table().unwrap();
        let names: Vec<&str> = dependencies.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            ["chrono", "percent-encoding", "reqwest", "serde", "serde_json", "thiserror", "uuid"]
        );
        assert_eq!(dependencies["reqwest"]["features"][0].as_str(), Some("json"));
    }

    #[test]
    fn write_manifest_creates_file() {
        let temp = tempfile::TempDir::new().unwrap();
        write_manifest(temp.path(), "petstore", false).unwrap();
        let text = std::fs::read_to_string(temp.path().join("Cargo.toml")).unwrap();
        assert!(text.contains("name = \"petstore\""));
    }
}
