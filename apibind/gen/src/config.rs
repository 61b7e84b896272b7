//! Generator configuration.
//!
//! [`GeneratorConfig`] is passed explicitly to
//! [`Generator::new`](crate::output::Generator::new). It can be read from a
//! TOML file and then overridden field by field from the command line.
//!
//! ```toml
//! base_module = "crate::apis"
//! indent = "\t"
//! type_visibility = "pub(crate)"
//! member_visibility = "pub"
//! crate_name = "petstore-client"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::GeneratorError;

/// Options shared by every unit of a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Module path holding `runtime` and the document modules. When this is
    /// `crate` the root unit is `lib.rs`, otherwise `mod.rs`.
    pub base_module: String,
    /// Indent unit of the formatted output. Spaces or tabs only.
    pub indent: String,
    /// Visibility of generated types, traits and runtime items.
    pub type_visibility: String,
    /// Visibility of generated struct fields and inherent methods.
    pub member_visibility: String,
    /// Package name written to the optional `Cargo.toml`.
    pub crate_name: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_module: "crate".to_string(),
            indent: "    ".to_string(),
            type_visibility: "pub".to_string(),
            member_visibility: "pub".to_string(),
            crate_name: "api-bindings".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Parses a configuration from TOML text. Missing keys keep their
    /// defaults.
    ///
    /// ## Examples
    ///
    /// ```
    /// use apibind_gen::config::GeneratorConfig;
    ///
    /// let config = GeneratorConfig::from_toml_str("indent = \"\\t\"").unwrap();
    /// assert_eq!(config.indent, "\t");
    /// assert_eq!(config.base_module, "crate");
    /// ```
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::ConfigError`] for malformed TOML or unknown
    /// keys.
    pub fn from_toml_str(text: &str) -> Result<Self, GeneratorError> {
        toml::from_str(text).map_err(|e| GeneratorError::ConfigError(e.to_string()))
    }

    /// Reads a configuration file.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::ReadError`] when the file cannot be read and
    /// [`GeneratorError::ConfigError`] when it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let text = fs::read_to_string(path).map_err(|source| GeneratorError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every field.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::ConfigError`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        self.base_path()?;
        if self.indent.is_empty() || !self.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(GeneratorError::ConfigError(format!(
                "indent must be a non-empty run of spaces or tabs, got {:?}",
                self.indent
            )));
        }
        self.type_vis()?;
        self.member_vis()?;
        if self.crate_name.trim().is_empty() {
            return Err(GeneratorError::ConfigError("crate_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// `true` when the root unit is `lib.rs`.
    pub fn is_crate_root(&self) -> bool {
        self.base_module == "crate"
    }

    pub(crate) fn base_path(&self) -> Result<syn::Path, GeneratorError> {
        syn::parse_str(&self.base_module).map_err(|e| {
            GeneratorError::ConfigError(format!("base_module '{}' is not a module path: {e}", self.base_module))
        })
    }

    pub(crate) fn type_vis(&self) -> Result<syn::Visibility, GeneratorError> {
        parse_visibility("type_visibility", &self.type_visibility)
    }

    pub(crate) fn member_vis(&self) -> Result<syn::Visibility, GeneratorError> {
        parse_visibility("member_visibility", &self.member_visibility)
    }
}

fn parse_visibility(field: &str, text: &str) -> Result<syn::Visibility, GeneratorError> {
    syn::parse_str(text)
        .map_err(|e| GeneratorError::ConfigError(format!("{field} '{text}' is not a visibility: {e}")))
}
