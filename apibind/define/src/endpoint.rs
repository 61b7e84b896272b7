//! HTTP operation descriptors.
//!
//! - [`ApiEndpoint`] - One path × method pair
//! - [`ApiEndpointParameter`] - A query, path or header parameter
//! - [`RequestBody`] / [`Response`] - Media-type keyed payload schemas
//! - [`StatusCode`] - A validated three-digit HTTP status code

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::descriptor::TypeDescriptor;

/// The media type used for JSON payloads.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Returns `true` for `application/json` and structured-syntax `+json` media
/// types, ignoring any parameters such as `charset`.
///
/// ## Examples
///
/// ```
/// use apibind_define::is_json_media_type;
///
/// assert!(is_json_media_type("application/json"));
/// assert!(is_json_media_type("application/problem+json; charset=utf-8"));
/// assert!(!is_json_media_type("text/plain"));
/// ```
pub fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == JSON_MEDIA_TYPE || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Picks the JSON schema out of a media-type map, preferring an exact
/// `application/json` entry.
fn json_schema(content: &BTreeMap<String, TypeDescriptor>) -> Option<&TypeDescriptor> {
    content.get(JSON_MEDIA_TYPE).or_else(|| {
        content
            .iter()
            .find(|(media_type, _)| is_json_media_type(media_type))
            .map(|(_, schema)| schema)
    })
}

/// HTTP methods recognized as operation keys of an OpenAPI path item.
///
/// ## Examples
///
/// ```
/// use std::str::FromStr;
/// use apibind_define::HttpMethod;
///
/// assert_eq!(HttpMethod::from_str("get").unwrap(), HttpMethod::Get);
/// assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
/// assert!(HttpMethod::from_str("parameters").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ParameterLocation {
    /// Appended to the query string.
    Query,
    /// Substituted into a `{placeholder}` of the path template.
    Path,
    /// Sent as a request header.
    Header,
}

/// Error returned when a status code is outside the `100..=599` range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a three-digit HTTP status code")]
pub struct InvalidStatusCode(pub String);

/// A validated HTTP status code.
///
/// ## Examples
///
/// ```
/// use apibind_define::StatusCode;
///
/// let created: StatusCode = "201".parse().unwrap();
/// assert!(created.is_success());
/// assert!("default".parse::<StatusCode>().is_err());
/// assert!(StatusCode::new(42).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);

    /// Creates a status code, rejecting values outside `100..=599`.
    ///
    /// ## Errors
    ///
    /// Returns [`InvalidStatusCode`] for out-of-range values.
    pub fn new(code: u16) -> Result<Self, InvalidStatusCode> {
        if (100..=599).contains(&code) {
            Ok(Self(code))
        } else {
            Err(InvalidStatusCode(code.to_string()))
        }
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// `200..=299`
    pub fn is_success(self) -> bool {
        (200..=299).contains(&self.0)
    }

    /// `400..=499`
    pub fn is_client_error(self) -> bool {
        (400..=499).contains(&self.0)
    }

    /// `500..=599`
    pub fn is_server_error(self) -> bool {
        (500..=599).contains(&self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StatusCode {
    type Err = InvalidStatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidStatusCode(s.to_string()));
        }
        let code = s.parse::<u16>().map_err(|_| InvalidStatusCode(s.to_string()))?;
        StatusCode::new(code).map_err(|_| InvalidStatusCode(s.to_string()))
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiEndpointParameter {
    /// The wire name of the parameter.
    pub name: String,
    /// Where the parameter is carried.
    pub location: ParameterLocation,
    /// The parameter's schema.
    pub schema: TypeDescriptor,
    /// The declared `required` flag; absence means "not required".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiEndpointParameter {
    /// Returns whether callers must supply this parameter.
    ///
    /// Path parameters are always required: a path template cannot be
    /// rendered without them.
    pub fn is_required(&self) -> bool {
        self.location == ParameterLocation::Path || self.required.unwrap_or(false)
    }
}

/// The request body of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    /// Schema per media type.
    pub content: BTreeMap<String, TypeDescriptor>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RequestBody {
    /// Returns the JSON schema of the body, if one is declared.
    pub fn json_schema(&self) -> Option<&TypeDescriptor> {
        json_schema(&self.content)
    }
}

/// One declared response of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status_code: StatusCode,
    /// Schema per media type; `None` when the response has no body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, TypeDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Response {
    /// Returns the JSON schema of the response body, if one is declared.
    pub fn json_schema(&self) -> Option<&TypeDescriptor> {
        self.content.as_ref().and_then(json_schema)
    }
}

/// One HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiEndpoint {
    pub method: HttpMethod,
    /// Path template with `{param}` placeholders.
    pub path: String,
    pub parameters: Vec<ApiEndpointParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Declared responses keyed by status code. Never empty for a parsed
    /// endpoint.
    pub responses: BTreeMap<StatusCode, Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
}

impl ApiEndpoint {
    /// Returns a `METHOD path` label used in diagnostics and docs.
    ///
    /// ## Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use apibind_define::{ApiEndpoint, HttpMethod};
    ///
    /// let endpoint = ApiEndpoint {
    ///     method: HttpMethod::Get,
    ///     path: "/pets/{petId}".to_string(),
    ///     parameters: vec![],
    ///     request_body: None,
    ///     responses: BTreeMap::new(),
    ///     operation_id: None,
    ///     tags: None,
    ///     summary: None,
    ///     description: None,
    ///     deprecated: false,
    /// };
    /// assert_eq!(endpoint.label(), "GET /pets/{petId}");
    /// ```
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Returns the `200` response, if declared.
    pub fn ok_response(&self) -> Option<&Response> {
        self.responses.get(&StatusCode::OK)
    }

    /// Returns the parameters carried in the given location, in declaration
    /// order.
    pub fn parameters_in(
        &self,
        location: ParameterLocation,
    ) -> impl Iterator<Item = &ApiEndpointParameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}
