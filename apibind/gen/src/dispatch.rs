//! Response dispatch planning.
//!
//! Every generated client method ends by mapping the actual HTTP status code
//! to a return value or a `ClientError`. The mapping is an ordered list of
//! arms evaluated top to bottom:
//!
//! 1. `200` returns the declared body (JSON or text), or nothing
//! 2. every other declared status code, ascending: 2xx returns nothing, the
//!    rest raise an error carrying the declared payload or the raw body
//! 3. `201..=299` returns nothing
//! 4. `400..=499` raises "Request error"
//! 5. `500..=599` raises "Server error"
//! 6. anything else raises "Unexpected status code"
//!
//! [`DispatchPlan`] captures this list once per operation. The live client
//! generator emits it as a `match`; [`DispatchPlan::resolve`] evaluates it
//! directly.

use apibind_define::{ApiEndpoint, Response, StatusCode};

use crate::errors::SchemaFormatError;
use crate::resolver::{ResolvedType, TypeResolver};

pub const REQUEST_ERROR: &str = "Request error";
pub const SERVER_ERROR: &str = "Server error";
pub const UNEXPECTED_STATUS: &str = "Unexpected status code";

/// The status codes an arm applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMatch {
    Exact(u16),
    /// Inclusive range.
    Range(u16, u16),
}

impl StatusMatch {
    pub fn matches(self, status: u16) -> bool {
        match self {
            StatusMatch::Exact(code) => status == code,
            StatusMatch::Range(low, high) => (low..=high).contains(&status),
        }
    }
}

/// How the `200` body is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessBody {
    /// Deserialized from JSON into the (optional) return type.
    Json(ResolvedType),
    /// Returned as the raw text body.
    Text,
}

/// What happens when an arm matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Return the `200` body.
    ReturnBody(SuccessBody),
    /// Return "no value".
    ReturnNothing,
    /// Raise an error carrying the deserialized payload.
    TypedError {
        description: String,
        payload: ResolvedType,
    },
    /// Raise an error carrying the raw text body.
    RawError { description: String },
    /// Undeclared 4xx.
    RequestError,
    /// Undeclared 5xx.
    ServerError,
    /// Anything not covered by another arm.
    UnexpectedStatus,
}

impl Outcome {
    /// Returns `true` if this outcome raises a `ClientError`.
    pub fn is_error(&self) -> bool {
        !matches!(self, Outcome::ReturnBody(_) | Outcome::ReturnNothing)
    }

    /// Returns the message carried by the raised error.
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::TypedError { description, .. } | Outcome::RawError { description } => {
                Some(description)
            }
            Outcome::RequestError => Some(REQUEST_ERROR),
            Outcome::ServerError => Some(SERVER_ERROR),
            Outcome::UnexpectedStatus => Some(UNEXPECTED_STATUS),
            Outcome::ReturnBody(_) | Outcome::ReturnNothing => None,
        }
    }
}

/// One arm of the dispatch `match`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchArm {
    pub status: StatusMatch,
    pub outcome: Outcome,
}

/// The ordered response dispatch of one operation.
///
/// ## Examples
///
/// ```
/// use apibind_gen::dispatch::{DispatchPlan, Outcome};
/// use apibind_gen::parser::parse_value;
/// use apibind_gen::resolver::TypeResolver;
/// use serde_json::json;
///
/// let doc = parse_value(&json!({
///     "paths": { "/widgets": { "get": { "responses": {
///         "200": { "content": { "application/json": { "schema": { "type": "string", "format": "uuid" } } } },
///         "404": { "description": "Not found" }
///     } } } }
/// }))
/// .unwrap();
/// let resolver = TypeResolver::new(&doc.schemas);
/// let plan = DispatchPlan::for_endpoint(&doc.endpoints[0], &resolver).unwrap();
///
/// assert!(matches!(plan.resolve(200), Outcome::ReturnBody(_)));
/// assert_eq!(plan.resolve(404), &Outcome::RawError { description: "Not found".to_string() });
/// assert_eq!(plan.resolve(204), &Outcome::ReturnNothing);
/// assert_eq!(plan.resolve(302), &Outcome::UnexpectedStatus);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    arms: Vec<DispatchArm>,
    fallback: Outcome,
    body: Option<SuccessBody>,
}

impl DispatchPlan {
    /// Builds the plan from an endpoint's declared responses.
    ///
    /// ## Errors
    ///
    /// Returns a [`SchemaFormatError`] if a response schema cannot be
    /// resolved.
    pub fn for_endpoint(endpoint: &ApiEndpoint, resolver: &TypeResolver<'_>) -> Result<Self, SchemaFormatError> {
        let body = match endpoint.ok_response().and_then(Response::json_schema) {
            Some(schema) if schema.is_plain_string() => Some(SuccessBody::Text),
            Some(schema) => Some(SuccessBody::Json(
                resolver
                    .resolve(&schema.to_nullable())
                    .map_err(|e| e.with_context("200"))?,
            )),
            None => None,
        };

        let mut arms = vec![DispatchArm {
            status: StatusMatch::Exact(StatusCode::OK.as_u16()),
            outcome: match &body {
                Some(body) => Outcome::ReturnBody(body.clone()),
                None => Outcome::ReturnNothing,
            },
        }];

        for (code, response) in &endpoint.responses {
            if *code == StatusCode::OK {
                continue;
            }
            let outcome = if code.is_success() {
                Outcome::ReturnNothing
            } else {
                let description = response
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("HTTP {code}"));
                match response.json_schema() {
                    Some(schema) => Outcome::TypedError {
                        description,
                        payload: resolver
                            .resolve(schema)
                            .map_err(|e| e.with_context(code.to_string()))?,
                    },
                    None => Outcome::RawError { description },
                }
            };
            arms.push(DispatchArm {
                status: StatusMatch::Exact(code.as_u16()),
                outcome,
            });
        }

        arms.push(DispatchArm {
            status: StatusMatch::Range(201, 299),
            outcome: Outcome::ReturnNothing,
        });
        arms.push(DispatchArm {
            status: StatusMatch::Range(400, 499),
            outcome: Outcome::RequestError,
        });
        arms.push(DispatchArm {
            status: StatusMatch::Range(500, 599),
            outcome: Outcome::ServerError,
        });

        Ok(Self {
            arms,
            fallback: Outcome::UnexpectedStatus,
            body,
        })
    }

    /// Returns the arms in evaluation order, excluding the fallback.
    pub fn arms(&self) -> &[DispatchArm] {
        &self.arms
    }

    /// Returns the outcome used when no arm matches.
    pub fn fallback(&self) -> &Outcome {
        &self.fallback
    }

    /// Returns how the `200` body is read, if the operation returns one.
    pub fn body(&self) -> Option<&SuccessBody> {
        self.body.as_ref()
    }

    /// Returns the return type of the generated method, `None` for unit.
    pub fn return_type(&self) -> Option<ResolvedType> {
        self.body.as_ref().map(|body| match body {
            SuccessBody::Json(resolved) => resolved.clone(),
            SuccessBody::Text => ResolvedType {
                name: "Option<String>".to_string(),
                reference_like: true,
            },
        })
    }

    /// Returns the payload types of all typed error arms, in arm order.
    pub fn error_payloads(&self) -> impl Iterator<Item = &ResolvedType> {
        self.arms.iter().filter_map(|arm| match &arm.outcome {
            Outcome::TypedError { payload, .. } => Some(payload),
            _ => None,
        })
    }

    /// Evaluates the arms against an actual status code.
    pub fn resolve(&self, status: u16) -> &Outcome {
        self.arms
            .iter()
            .find(|arm| arm.status.matches(status))
            .map_or(&self.fallback, |arm| &arm.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_value;
    use apibind_define::ApiDocument;
    use serde_json::{Value, json};

    fn document(responses: Value) -> ApiDocument {
        parse_value(&json!({
            "components": { "schemas": {
                "Widget": { "type": "object", "properties": { "id": { "type": "integer" } } },
                "Problem": { "type": "object", "properties": { "detail": { "type": "string" } } }
            } },
            "paths": { "/widgets/{id}": { "get": { "responses": responses } } }
        }))
        .unwrap()
    }

    fn plan(doc: &ApiDocument) -> DispatchPlan {
        let resolver = TypeResolver::new(&doc.schemas);
        DispatchPlan::for_endpoint(&doc.endpoints[0], &resolver).unwrap()
    }

    fn widget_document() -> ApiDocument {
        document(json!({
            "200": { "description": "OK", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Widget" } } } },
            "404": { "description": "Not found" },
            "500": { "description": "Boom" }
        }))
    }

    #[test]
    fn ok_returns_widget() {
        let doc = widget_document();
        let plan = plan(&doc);
        let Outcome::ReturnBody(SuccessBody::Json(resolved)) = plan.resolve(200) else {
            panic!("expected a JSON body");
        };
        assert_eq!(resolved.name, "Option<Widget>");
    }

    #[test]
    fn undeclared_no_content_returns_nothing() {
        let doc = widget_document();
        assert_eq!(plan(&doc).resolve(204), &Outcome::ReturnNothing);
    }

    #[test]
    fn declared_not_found_raises_raw_error() {
        let doc = widget_document();
        assert_eq!(
            plan(&doc).resolve(404),
            &Outcome::RawError {
                description: "Not found".to_string()
            }
        );
    }

    #[test]
    fn undeclared_forbidden_is_request_error() {
        let doc = widget_document();
        let plan = plan(&doc);
        assert_eq!(plan.resolve(403), &Outcome::RequestError);
        assert_eq!(plan.resolve(403).message(), Some("Request error"));
    }

    #[test]
    fn undeclared_unavailable_is_server_error() {
        let doc = widget_document();
        let plan = plan(&doc);
        assert_eq!(plan.resolve(503), &Outcome::ServerError);
        assert_eq!(plan.resolve(503).message(), Some("Server error"));
        assert_eq!(
            plan.resolve(500),
            &Outcome::RawError {
                description: "Boom".to_string()
            }
        );
    }

    #[test]
    fn other_codes_are_unexpected() {
        let doc = widget_document();
        let plan = plan(&doc);
        for status in [100, 199, 301, 304, 600] {
            assert_eq!(plan.resolve(status), &Outcome::UnexpectedStatus, "{status}");
        }
    }

    #[test]
    fn declared_codes_precede_ranges() {
        let doc = widget_document();
        let statuses: Vec<_> = plan(&doc).arms().iter().map(|arm| arm.status).collect();
        assert_eq!(
            statuses,
            vec![
                StatusMatch::Exact(200),
                StatusMatch::Exact(404),
                StatusMatch::Exact(500),
                StatusMatch::Range(201, 299),
                StatusMatch::Range(400, 499),
                StatusMatch::Range(500, 599),
            ]
        );
    }

    #[test]
    fn declared_success_codes_return_nothing() {
        let doc = document(json!({
            "202": { "description": "Accepted", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Widget" } } } }
        }));
        let plan = plan(&doc);
        assert_eq!(plan.resolve(202), &Outcome::ReturnNothing);
        assert_eq!(plan.resolve(200), &Outcome::ReturnNothing);
        assert!(plan.return_type().is_none());
    }

    #[test]
    fn typed_error_payload() {
        let doc = document(json!({
            "200": { "description": "OK" },
            "422": { "description": "Invalid widget", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Problem" } } } },
            "409": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Problem" } } } }
        }));
        let plan = plan(&doc);
        let Outcome::TypedError { description, payload } = plan.resolve(422) else {
            panic!("expected typed error");
        };
        assert_eq!(description, "Invalid widget");
        assert_eq!(payload.name, "Problem");
        assert_eq!(plan.resolve(409).message(), Some("HTTP 409"));
        assert_eq!(plan.error_payloads().count(), 2);
    }

    #[test]
    fn plain_string_body_is_text() {
        let doc = document(json!({
            "200": { "content": { "application/json": { "schema": { "type": "string" } } } }
        }));
        let plan = plan(&doc);
        assert_eq!(plan.body(), Some(&SuccessBody::Text));
        assert_eq!(plan.return_type().unwrap().name, "Option<String>");
    }

    #[test]
    fn nullable_body_is_not_doubly_optional() {
        let doc = document(json!({
            "200": { "content": { "application/json": { "schema": { "type": "integer", "nullable": true } } } }
        }));
        assert_eq!(plan(&doc).return_type().unwrap().name, "Option<i32>");
    }

    #[test]
    fn unresolvable_payload_is_an_error() {
        let doc = document(json!({
            "400": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Missing" } } } }
        }));
        let resolver = TypeResolver::new(&doc.schemas);
        let err = DispatchPlan::for_endpoint(&doc.endpoints[0], &resolver).unwrap_err();
        assert_eq!(err.context(), ["400".to_string()]);
    }

    #[test]
    fn error_outcomes() {
        assert!(!Outcome::ReturnNothing.is_error());
        assert!(Outcome::UnexpectedStatus.is_error());
        assert_eq!(Outcome::ReturnNothing.message(), None);
    }
}
