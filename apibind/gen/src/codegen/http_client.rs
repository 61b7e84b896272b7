//! Live client generation (`http_client.rs`).
//!
//! `{Api}HttpClient` wraps the runtime `ApiClientBase`. Each method renders
//! the path, builds the query string, serializes the body, performs exactly
//! one request and then runs the operation's response dispatch as a `match`
//! on the status code.

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use super::UnitContext;
use super::client_trait::PayloadVariants;
use super::operation::OperationPlan;
use crate::dispatch::{Outcome, StatusMatch, SuccessBody};
use crate::errors::GeneratorError;

/// Generates the `http_client.rs` unit.
///
/// ## Errors
///
/// Returns [`GeneratorError::CodeGenError`] if a resolved type fails to parse
/// or a typed error payload has no `{Api}ErrorPayload` variant.
pub fn generate_http_client(
    ctx: &UnitContext<'_>,
    plans: &[OperationPlan<'_>],
    payloads: &PayloadVariants,
) -> Result<TokenStream, GeneratorError> {
    let vis = &ctx.type_vis;
    let member_vis = &ctx.member_vis;
    let struct_name = ctx.api_ident("", "HttpClient");
    let trait_name = ctx.api_ident("", "Client");
    let payload_name = ctx.api_ident("", "ErrorPayload");
    let result_name = ctx.api_ident("", "Result");
    let dtos = ctx.unit_path("dtos");
    let client = ctx.unit_path("client");
    let runtime = ctx.runtime_path();

    let methods = plans
        .iter()
        .map(|plan| generate_method(plan, payloads, &payload_name, &result_name))
        .collect::<Result<Vec<_>, _>>()?;

    let bearer = ctx.document.uses_bearer_auth().then(|| {
        quote! {
            /// Creates a client that sends `Authorization: Bearer {token}`
            /// with every request.
            #member_vis fn with_bearer_token(http: reqwest::Client, base_url: impl Into<String>, token: &str) -> Self {
                let client = Self::new(http, base_url);
                client.base.set_auth_header("Bearer", Some(token));
                client
            }
        }
    });

    let module_doc = format!(" HTTP client for the {} API.", ctx.display_name());
    let struct_doc = format!(" [`{trait_name}`] implementation backed by `reqwest`.");

    Ok(quote! {
        #![doc = #module_doc]

        #[allow(unused_imports)]
        use #dtos::*;
        #[allow(unused_imports)]
        use #client::{#payload_name, #result_name, #trait_name};
        #[allow(unused_imports)]
        use #runtime::{ApiClientBase, ClientError, encode_path_segment, encode_query_component};

        #[doc = #struct_doc]
        #[derive(Debug)]
        #vis struct #struct_name {
            base: ApiClientBase,
        }

        impl #struct_name {
            /// Creates a client sending requests to `base_url` through `http`.
            #member_vis fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
                Self {
                    base: ApiClientBase::new(http, base_url),
                }
            }

            #bearer

            /// Returns the underlying runtime base.
            #member_vis fn base(&self) -> &ApiClientBase {
                &self.base
            }
        }

        impl #trait_name for #struct_name {
            #(#methods)*

            fn set_auth_header(&self, scheme: &str, parameter: Option<&str>) {
                self.base.set_auth_header(scheme, parameter);
            }

            fn clear_auth_header(&self) {
                self.base.clear_auth_header();
            }
        }
    })
}

fn generate_method(
    plan: &OperationPlan<'_>,
    payloads: &PayloadVariants,
    payload_name: &proc_macro2::Ident,
    result_name: &proc_macro2::Ident,
) -> Result<TokenStream, GeneratorError> {
    let name = &plan.method_name;
    let params = plan.signature_params(false)?;
    let success = plan.success_type()?;
    let path = plan.path_tokens();
    let query = plan.query.to_tokens();
    let body = plan.body_tokens();
    let headers = plan.header_tokens();
    let method = format_ident!("{}", plan.endpoint.method.to_string());

    let send = if headers.is_empty() {
        quote! {
            self.base
                .send(reqwest::Method::#method, &path_and_query, request_body)
                .await?
        }
    } else {
        quote! {
            self.base
                .send_with_headers(reqwest::Method::#method, &path_and_query, request_body, &request_headers)
                .await?
        }
    };

    let empty = plan.empty_return();
    let arms = plan
        .dispatch
        .arms()
        .iter()
        .map(|arm| {
            let pattern = status_pattern(arm.status);
            let outcome = outcome_tokens(plan, &arm.outcome, payloads, payload_name, &empty)?;
            Ok(quote! { #pattern => #outcome, })
        })
        .collect::<Result<Vec<_>, GeneratorError>>()?;
    let fallback = outcome_tokens(plan, plan.dispatch.fallback(), payloads, payload_name, &empty)?;

    Ok(quote! {
        async fn #name(&self #(, #params)*) -> #result_name<#success> {
            #path
            #query
            #body
            #headers
            let response = #send;
            let status = response.status().as_u16();
            match status {
                #(#arms)*
                _ => #fallback,
            }
        }
    })
}

fn status_pattern(status: StatusMatch) -> TokenStream {
    match status {
        StatusMatch::Exact(code) => {
            let code = Literal::u16_unsuffixed(code);
            quote! { #code }
        }
        StatusMatch::Range(low, high) => {
            let low = Literal::u16_unsuffixed(low);
            let high = Literal::u16_unsuffixed(high);
            quote! { #low..=#high }
        }
    }
}

fn outcome_tokens(
    plan: &OperationPlan<'_>,
    outcome: &Outcome,
    payloads: &PayloadVariants,
    payload_name: &proc_macro2::Ident,
    empty: &TokenStream,
) -> Result<TokenStream, GeneratorError> {
    let tokens = match outcome {
        Outcome::ReturnBody(SuccessBody::Json(resolved)) => {
            let ty = resolved.to_type()?;
            quote! { Ok(response.json::<#ty>().await?) }
        }
        Outcome::ReturnBody(SuccessBody::Text) => quote! { Ok(Some(response.text().await?)) },
        Outcome::ReturnNothing => empty.clone(),
        Outcome::TypedError { description, payload } => {
            let variant = payloads.variant(payload).ok_or_else(|| {
                GeneratorError::CodeGenError(format!(
                    "No error payload variant for '{}' in {}",
                    payload.name,
                    plan.endpoint.label()
                ))
            })?;
            let ty = payload.to_type()?;
            quote! {
                Err(ClientError::Payload {
                    status,
                    message: #description.to_string(),
                    payload: #payload_name::#variant(response.json::<#ty>().await?),
                })
            }
        }
        Outcome::RawError { .. } | Outcome::RequestError | Outcome::ServerError | Outcome::UnexpectedStatus => {
            let message = outcome.message().unwrap_or_default();
            quote! {
                Err(ClientError::Status {
                    status,
                    message: #message.to_string(),
                    body: response.text().await?,
                })
            }
        }
    };
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::operation::plan_operations;
    use crate::parser::parse_value;
    use crate::test_utils::{compact, context_for, format_generated_code};
    use apibind_define::ApiDocument;
    use serde_json::{Value, json};

    fn document(extra: Value) -> ApiDocument {
        let mut root = json!({
            "info": { "title": "Pet Store" },
            "components": { "schemas": {
                "Pet": { "type": "object", "properties": { "id": { "type": "integer" } } },
                "Problem": { "type": "object", "properties": { "detail": { "type": "string" } } }
            } },
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "operationId": "getPet",
                        "parameters": [
                            { "name": "petId", "in": "path", "schema": { "type": "integer", "format": "int64" } },
                            { "name": "tags", "in": "query", "schema": { "type": "array", "items": { "type": "string" } } }
                        ],
                        "responses": {
                            "200": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } } },
                            "404": { "description": "Pet not found" },
                            "422": { "description": "Invalid", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Problem" } } } }
                        }
                    }
                }
            }
        });
        if let (Some(root), Some(extra)) = (root.as_object_mut(), extra.as_object()) {
            root.extend(extra.clone());
        }
        parse_value(&root).unwrap()
    }

    fn generate(doc: &ApiDocument) -> TokenStream {
        let ctx = context_for(doc);
        let plans = plan_operations(doc, &ctx.resolver).unwrap();
        let payloads = PayloadVariants::collect(&plans);
        generate_http_client(&ctx, &plans, &payloads).unwrap()
    }

    #[test]
    fn dispatch_arms_in_order() {
        let doc = document(json!({}));
        let code = compact(&generate(&doc));
        let order = [
            "200=>Ok(response.json::<Option<Pet>>().await?),",
            "404=>Err(ClientError::Status{status,message:\"Petnotfound\".to_string(),body:response.text().await?,}),",
            "422=>Err(ClientError::Payload{status,message:\"Invalid\".to_string(),payload:PetStoreErrorPayload::Problem(response.json::<Problem>().await?),}),",
            "201..=299=>Ok(None),",
            "400..=499=>Err(ClientError::Status{status,message:\"Requesterror\".to_string(),",
            "500..=599=>Err(ClientError::Status{status,message:\"Servererror\".to_string(),",
            "_=>Err(ClientError::Status{status,message:\"Unexpectedstatuscode\".to_string(),",
        ];
        let mut last = 0;
        for arm in order {
            let position = code[last..].find(arm).unwrap_or_else(|| panic!("missing {arm} in {code}"));
            last += position + arm.len();
        }
    }

    #[test]
    fn request_is_built_from_path_query_and_body() {
        let doc = document(json!({}));
        let code = compact(&generate(&doc));
        assert!(code.contains("asyncfnget_pet(&self,pet_id:i64,tags:Option<Vec<String>>)->PetStoreResult<Option<Pet>>"), "{code}");
        assert!(code.contains("encode_path_segment(&pet_id.to_string())"), "{code}");
        assert!(code.contains("letrequest_body:Option<String>=None;"), "{code}");
        assert!(code.contains("self.base.send(reqwest::Method::GET,&path_and_query,request_body).await?"), "{code}");
    }

    #[test]
    fn bearer_constructor_only_with_bearer_scheme() {
        let plain = format_generated_code(&generate(&document(json!({})))).unwrap();
        assert!(!plain.contains("with_bearer_token"));
        assert!(plain.contains("pub struct PetStoreHttpClient {"), "{plain}");
        assert!(plain.contains("impl PetStoreClient for PetStoreHttpClient {"), "{plain}");

        let secured = document(json!({
            "components": {
                "schemas": {
                    "Pet": { "type": "object", "properties": { "id": { "type": "integer" } } },
                    "Problem": { "type": "object", "properties": { "detail": { "type": "string" } } }
                },
                "securitySchemes": { "bearerAuth": { "type": "http", "scheme": "bearer" } }
            },
            "security": [{ "bearerAuth": [] }]
        }));
        let code = format_generated_code(&generate(&secured)).unwrap();
        assert!(code.contains("pub fn with_bearer_token("), "{code}");
        assert!(code.contains("set_auth_header(\"Bearer\", Some(token))"), "{code}");
    }

    #[test]
    fn header_parameters_use_send_with_headers() {
        let doc = parse_value(&json!({
            "info": { "title": "Pet Store" },
            "paths": { "/pets": { "post": {
                "parameters": [{ "name": "X-Api-Version", "in": "header", "required": true, "schema": { "type": "string" } }],
                "requestBody": { "content": { "application/json": { "schema": { "type": "object" } } } },
                "responses": { "204": { "description": "Created" } }
            } } }
        }))
        .unwrap();
        let code = compact(&generate(&doc));
        assert!(code.contains("send_with_headers(reqwest::Method::POST,&path_and_query,request_body,&request_headers)"), "{code}");
        assert!(code.contains("letrequest_body=Some(serde_json::to_string(&body)?);"), "{code}");
        assert!(code.contains("200=>Ok(()),"), "{code}");
        assert!(code.contains("204=>Ok(()),"), "{code}");
    }

    #[test]
    fn text_body_for_plain_strings() {
        let doc = parse_value(&json!({
            "paths": { "/ping": { "get": { "responses": {
                "200": { "content": { "application/json": { "schema": { "type": "string" } } } }
            } } } }
        }))
        .unwrap();
        let code = compact(&generate(&doc));
        assert!(code.contains("200=>Ok(Some(response.text().await?)),"), "{code}");
    }
}
