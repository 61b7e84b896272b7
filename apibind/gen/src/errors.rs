//! Error types for the apibind generator.

use std::fmt;

use thiserror::Error;

/// A document that cannot be compiled because one of its fragments is
/// missing a mandatory field or uses an unsupported shape.
///
/// Context frames name where the problem was found (schema, property,
/// `METHOD path`, parameter) and are rendered innermost first:
///
/// ```
/// use apibind_gen::errors::SchemaFormatError;
///
/// let err = SchemaFormatError::new("array type requires items type to be defined")
///     .with_context("tags")
///     .with_context("Pet");
/// assert_eq!(err.to_string(), "array type requires items type to be defined (tags) (Pet)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", render_context(.context))]
pub struct SchemaFormatError {
    message: String,
    context: Vec<String>,
}

fn render_context(context: &[String]) -> String {
    context.iter().map(|frame| format!(" ({frame})")).collect()
}

impl SchemaFormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Appends an outer context frame.
    pub fn with_context(mut self, frame: impl Into<String>) -> Self {
        self.context.push(frame.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }
}

/// Errors that can occur during code generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The document has an unsupported or incomplete shape
    #[error(transparent)]
    SchemaFormat(#[from] SchemaFormatError),

    /// The document is not valid JSON
    #[error("Failed to parse document '{path}': {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read an input document or configuration file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to generate code
    #[error("Code generation failed: {0}")]
    CodeGenError(String),

    /// Failed to write output file
    #[error("Failed to write output file '{path}': {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl GeneratorError {
    /// Appends a context frame to schema format errors; other errors are
    /// returned unchanged.
    pub fn with_context(self, frame: impl Into<String>) -> Self {
        match self {
            GeneratorError::SchemaFormat(err) => GeneratorError::SchemaFormat(err.with_context(frame)),
            other => other,
        }
    }

    /// Returns the stable diagnostic code for this error.
    ///
    /// ## Examples
    ///
    /// ```
    /// use apibind_gen::errors::{GeneratorError, SchemaFormatError};
    ///
    /// let err = GeneratorError::from(SchemaFormatError::new("Responses were not provided."));
    /// assert_eq!(err.code(), "SG_API_001");
    /// ```
    pub fn code(&self) -> &'static str {
        match self {
            GeneratorError::SchemaFormat(_) => "SG_API_001",
            GeneratorError::InvalidJson { .. } => "SG_API_002",
            GeneratorError::ReadError { .. } | GeneratorError::WriteError { .. } => "SG_API_003",
            GeneratorError::CodeGenError(_) => "SG_API_004",
            GeneratorError::ConfigError(_) => "SG_API_005",
        }
    }
}

/// A fatal failure for one input document, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable code, e.g. `SG_API_001`.
    pub code: &'static str,
    /// The document the failure belongs to.
    pub document: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(document: impl Into<String>, error: &GeneratorError) -> Self {
        Self {
            code: error.code(),
            document: document.into(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}: {}", self.code, self.document, self.message)
    }
}
