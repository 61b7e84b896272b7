//! The parsed form of a whole OpenAPI document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::SchemaMap;
use crate::endpoint::ApiEndpoint;
use crate::security::SecuritySchemeDescriptor;

/// The `info` object of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything the generators need from one document.
///
/// Produced in a single pass by the parser and consumed read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiDocument {
    /// The `openapi` (or `swagger`) version string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ApiInfo>,
    pub schemas: SchemaMap,
    pub endpoints: Vec<ApiEndpoint>,
    pub security_schemes: BTreeMap<String, SecuritySchemeDescriptor>,
    /// Names of the schemes listed in the top-level `security` requirement.
    pub security: Vec<String>,
}

impl ApiDocument {
    /// Returns the non-empty document title, if any.
    pub fn title(&self) -> Option<&str> {
        self.info
            .as_ref()
            .map(|info| info.title.trim())
            .filter(|title| !title.is_empty())
    }

    /// Returns the document version, if any.
    pub fn version(&self) -> Option<&str> {
        self.info.as_ref().and_then(|info| info.version.as_deref())
    }

    /// Returns `true` when any declared security scheme is bearer-style.
    pub fn uses_bearer_auth(&self) -> bool {
        self.security_schemes.values().any(SecuritySchemeDescriptor::is_bearer)
    }
}
