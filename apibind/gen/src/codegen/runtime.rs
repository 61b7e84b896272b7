//! Runtime unit generation (`runtime.rs`).
//!
//! The runtime is emitted once per run and shared by every generated client.
//! It holds the HTTP plumbing (`ApiClientBase`), the generic `ClientError`
//! raised by response dispatch, and the percent-encoding helpers used for
//! path segments and query components.

use proc_macro2::TokenStream;
use quote::quote;

/// Generates the `runtime.rs` unit.
///
/// `vis` is applied to every item the generated clients use.
pub fn generate_runtime(vis: &syn::Visibility) -> TokenStream {
    quote! {
        //! Runtime support shared by the generated API clients.

        use std::sync::{PoisonError, RwLock};

        use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

        /// Characters left unescaped in path segments and query components.
        const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
            .remove(b'-')
            .remove(b'.')
            .remove(b'_')
            .remove(b'~');

        /// Percent-encodes a query string name or value.
        #vis fn encode_query_component(value: &str) -> String {
            utf8_percent_encode(value, COMPONENT).to_string()
        }

        /// Percent-encodes one path segment.
        #vis fn encode_path_segment(value: &str) -> String {
            utf8_percent_encode(value, COMPONENT).to_string()
        }

        /// Errors returned by generated client methods.
        ///
        /// `P` is the API's error payload enum, carried by declared error
        /// responses with a JSON body.
        #[derive(Debug, thiserror::Error)]
        #vis enum ClientError<P: std::fmt::Debug> {
            /// The request could not be sent or the body could not be read.
            #[error("HTTP request failed: {0}")]
            Http(#[from] reqwest::Error),

            /// A JSON body could not be serialized or deserialized.
            #[error("JSON serialization failed: {0}")]
            Json(#[from] serde_json::Error),

            /// A response without a typed payload.
            #[error("{message} (status {status})")]
            Status {
                status: u16,
                message: String,
                body: String,
            },

            /// A declared error response with a typed payload.
            #[error("{message} (status {status})")]
            Payload {
                status: u16,
                message: String,
                payload: P,
            },
        }

        impl<P: std::fmt::Debug> ClientError<P> {
            /// Returns the HTTP status code, if a response was received.
            #vis fn status(&self) -> Option<u16> {
                match self {
                    Self::Status { status, .. } | Self::Payload { status, .. } => Some(*status),
                    Self::Http(err) => err.status().map(|status| status.as_u16()),
                    Self::Json(_) => None,
                }
            }

            /// Returns the error message of a status error.
            #vis fn message(&self) -> Option<&str> {
                match self {
                    Self::Status { message, .. } | Self::Payload { message, .. } => Some(message),
                    Self::Http(_) | Self::Json(_) => None,
                }
            }

            /// Returns the raw response body of an untyped status error.
            #vis fn body(&self) -> Option<&str> {
                match self {
                    Self::Status { body, .. } => Some(body),
                    _ => None,
                }
            }

            /// Returns the typed payload of a declared error response.
            #vis fn payload(&self) -> Option<&P> {
                match self {
                    Self::Payload { payload, .. } => Some(payload),
                    _ => None,
                }
            }
        }

        /// HTTP plumbing shared by generated clients.
        ///
        /// The `Authorization` header is kept behind a lock so a client can be
        /// shared between tasks and still have its credentials replaced.
        #[derive(Debug)]
        #vis struct ApiClientBase {
            http: reqwest::Client,
            base_url: String,
            authorization: RwLock<Option<String>>,
        }

        impl ApiClientBase {
            /// Creates a base sending requests to `base_url` through `http`.
            #vis fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
                Self {
                    http,
                    base_url: base_url.into(),
                    authorization: RwLock::new(None),
                }
            }

            /// Returns the base URL requests are sent to.
            #vis fn base_url(&self) -> &str {
                &self.base_url
            }

            /// Sets the `Authorization` header to `{scheme} {parameter}`, or
            /// to `{scheme}` alone when there is no parameter.
            #vis fn set_auth_header(&self, scheme: &str, parameter: Option<&str>) {
                let value = match parameter {
                    Some(parameter) => format!("{scheme} {parameter}"),
                    None => scheme.to_string(),
                };
                *self.authorization.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
            }

            /// Stops sending the `Authorization` header.
            #vis fn clear_auth_header(&self) {
                *self.authorization.write().unwrap_or_else(PoisonError::into_inner) = None;
            }

            /// Sends one request. `body` is sent as JSON when present.
            #vis async fn send(
                &self,
                method: reqwest::Method,
                path_and_query: &str,
                body: Option<String>,
            ) -> Result<reqwest::Response, reqwest::Error> {
                self.send_with_headers(method, path_and_query, body, &[]).await
            }

            /// Sends one request with additional headers.
            #vis async fn send_with_headers(
                &self,
                method: reqwest::Method,
                path_and_query: &str,
                body: Option<String>,
                headers: &[(&str, String)],
            ) -> Result<reqwest::Response, reqwest::Error> {
                let url = format!("{}{}", self.base_url.trim_end_matches('/'), path_and_query);
                let mut request = self.http.request(method, url);
                if let Some(authorization) = self.authorization() {
                    request = request.header(reqwest::header::AUTHORIZATION, authorization);
                }
                for (name, value) in headers {
                    request = request.header(*name, value.as_str());
                }
                if let Some(body) = body {
                    request = request
                        .header(reqwest::header::CONTENT_TYPE, "application/json")
                        .body(body);
                }
                request.send().await
            }

            fn authorization(&self) -> Option<String> {
                self.authorization
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{format_generated_code, validate_generated_code};

    #[test]
    fn runtime_is_valid_rust() {
        let tokens = generate_runtime(&syn::parse_quote!(pub));
        validate_generated_code(&tokens).unwrap();
    }

    #[test]
    fn runtime_items() {
        let code = format_generated_code(&generate_runtime(&syn::parse_quote!(pub))).unwrap();
        assert!(code.contains("pub struct ApiClientBase {"), "{code}");
        assert!(code.contains("pub enum ClientError<P: std::fmt::Debug> {"), "{code}");
        assert!(code.contains("pub fn encode_query_component(value: &str) -> String"), "{code}");
        assert!(code.contains("pub fn encode_path_segment(value: &str) -> String"), "{code}");
        assert!(code.contains("pub async fn send_with_headers("), "{code}");
        assert!(code.contains("pub fn clear_auth_header(&self)"), "{code}");
    }

    #[test]
    fn visibility_is_applied() {
        let code = format_generated_code(&generate_runtime(&syn::parse_quote!(pub(crate)))).unwrap();
        assert!(code.contains("pub(crate) struct ApiClientBase {"), "{code}");
        assert!(code.contains("pub(crate) fn set_auth_header("), "{code}");
    }
}
