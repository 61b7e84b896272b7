//! Security scheme descriptors.

use serde::{Deserialize, Serialize};

/// A scheme declared under `components.securitySchemes`.
///
/// Only used to decide whether generated clients offer bearer-token
/// authentication out of the box.
///
/// ## Examples
///
/// ```
/// use apibind_define::SecuritySchemeDescriptor;
///
/// let scheme: SecuritySchemeDescriptor = serde_json::from_str(
///     r#"{ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }"#,
/// ).unwrap();
///
/// assert!(scheme.is_bearer());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySchemeDescriptor {
    /// `apiKey`, `http`, `oauth2`, `openIdConnect` or `mutualTLS`.
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// Header, query or cookie name for `apiKey` schemes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `in` for `apiKey` schemes.
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP authorization scheme for `http` schemes, e.g. `bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
}

impl SecuritySchemeDescriptor {
    /// Returns `true` when the scheme transmits a bearer token in the
    /// `Authorization` header.
    pub fn is_bearer(&self) -> bool {
        match self.scheme_type.as_str() {
            "http" => self
                .scheme
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("bearer")),
            "oauth2" | "openIdConnect" => true,
            _ => false,
        }
    }
}
