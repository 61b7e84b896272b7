//! Module documentation for the per-document `mod.rs`.
//!
//! [`ModuleDocBuilder`] renders an introduction, an authentication section,
//! the operations grouped by HTTP method, and a usage example.

use std::collections::BTreeMap;

use apibind_define::HttpMethod;
use proc_macro2::TokenStream;
use quote::quote;

use super::UnitContext;
use super::operation::OperationPlan;

/// Builds module-level documentation for one generated API module.
pub struct ModuleDocBuilder<'a> {
    ctx: &'a UnitContext<'a>,
    plans: &'a [OperationPlan<'a>],
}

impl<'a> ModuleDocBuilder<'a> {
    pub fn new(ctx: &'a UnitContext<'a>, plans: &'a [OperationPlan<'a>]) -> Self {
        Self { ctx, plans }
    }

    /// Builds the `#![doc = "..."]` attributes.
    pub fn build(&self) -> TokenStream {
        let intro = self.intro_paragraph();
        let auth_section = self.auth_section();
        let features_section = self.features_section();
        let example_section = self.example_section();

        quote! {
            #![doc = #intro]
            //!
            #![doc = #auth_section]
            //!
            #![doc = #features_section]
            //!
            #![doc = #example_section]
        }
    }

    fn intro_paragraph(&self) -> String {
        let document = self.ctx.document;
        let mut intro = format!(" Generated API client for {}", self.ctx.display_name());
        if let Some(version) = document.version() {
            intro.push_str(&format!(" (version {version})"));
        }
        intro.push('.');

        let description = document
            .info
            .as_ref()
            .and_then(|info| info.description.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(description) = description {
            intro.push_str("\n\n");
            let lines: Vec<String> = description.lines().map(|l| format!(" {}", l.trim_end())).collect();
            intro.push_str(&lines.join("\n"));
        }
        intro
    }

    fn auth_section(&self) -> String {
        let document = self.ctx.document;
        let description = if document.uses_bearer_auth() {
            let constructor = self.ctx.api_ident("", "HttpClient");
            format!(
                "Uses bearer token authentication. Create the client with `{constructor}::with_bearer_token` \
                 or call `set_auth_header(\"Bearer\", Some(token))`."
            )
        } else if !document.security_schemes.is_empty() {
            let names: Vec<&str> = document.security_schemes.keys().map(String::as_str).collect();
            format!(
                "Declares the `{}` security scheme(s). Use `set_auth_header` to send an `Authorization` header.",
                names.join("`, `")
            )
        } else {
            "No authentication required.".to_string()
        };
        format!(" ## Authentication\n\n {description}")
    }

    fn categorize_operations(&self) -> BTreeMap<HttpMethod, Vec<(String, String)>> {
        let mut categories: BTreeMap<HttpMethod, Vec<(String, String)>> = BTreeMap::new();
        for plan in self.plans {
            let endpoint = plan.endpoint;
            let summary = endpoint
                .summary
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("`{}`", endpoint.label()));
            categories
                .entry(endpoint.method)
                .or_default()
                .push((plan.method_name.to_string(), summary));
        }
        categories
    }

    fn features_section(&self) -> String {
        let categories = self.categorize_operations();
        if categories.is_empty() {
            return " ## Operations\n\n No operations defined.".to_string();
        }

        let mut lines = vec![" ## Operations".to_string(), String::new()];
        for (method, operations) in &categories {
            lines.push(format!(" **{method}**:"));
            for (name, summary) in operations {
                lines.push(format!(" - `{name}` - {summary}"));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Uses the first GET operation without parameters, else the first
    /// operation.
    fn example_section(&self) -> String {
        let plan = self
            .plans
            .iter()
            .find(|p| p.endpoint.method == HttpMethod::Get && p.params.is_empty())
            .or_else(|| self.plans.first());

        let Some(plan) = plan else {
            return " ## Example\n\n No operations available for example.".to_string();
        };

        let client = self.ctx.api_ident("", "HttpClient");
        let client_trait = self.ctx.api_ident("", "Client");
        let module = &self.ctx.module;
        let method = &plan.method_name;
        let args = if plan.params.is_empty() { "" } else { "/* ... */" };

        format!(
            r#" ## Example

 ```ignore
 use {module}::{{{client}, {client_trait}}};

 #[tokio::main]
 async fn main() -> Result<(), Box<dyn std::error::Error>> {{
     let client = {client}::new(reqwest::Client::new(), "https://api.example.com");
     let response = client.{method}({args}).await?;
     println!("{{:?}}", response);
     Ok(())
 }}
 ```"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::operation::plan_operations;
    use crate::parser::parse_value;
    use crate::test_utils::context_for;
    use apibind_define::ApiDocument;
    use serde_json::json;

    fn petstore() -> ApiDocument {
        parse_value(&json!({
            "info": { "title": "Pet Store", "version": "1.0.0", "description": "Sells pets." },
            "components": {
                "securitySchemes": { "bearerAuth": { "type": "http", "scheme": "bearer" } }
            },
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "summary": "List all pets",
                        "responses": { "200": { "description": "ok" } }
                    },
                    "post": {
                        "operationId": "createPet",
                        "responses": { "201": { "description": "created" } }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn intro_includes_title_version_and_description() {
        let doc = petstore();
        let ctx = context_for(&doc);
        let plans = plan_operations(&doc, &ctx.resolver).unwrap();
        let intro = ModuleDocBuilder::new(&ctx, &plans).intro_paragraph();
        assert!(intro.starts_with(" Generated API client for Pet Store (version 1.0.0)."));
        assert!(intro.contains("Sells pets."));
    }

    #[test]
    fn auth_section_mentions_bearer_constructor() {
        let doc = petstore();
        let ctx = context_for(&doc);
        let plans = plan_operations(&doc, &ctx.resolver).unwrap();
        let auth = ModuleDocBuilder::new(&ctx, &plans).auth_section();
        assert!(auth.contains("PetStoreHttpClient::with_bearer_token"), "{auth}");
    }

    #[test]
    fn auth_section_none() {
        let mut doc = petstore();
        doc.security_schemes.clear();
        let ctx = context_for(&doc);
        let auth = ModuleDocBuilder::new(&ctx, &[]).auth_section();
        assert!(auth.contains("No authentication required"));
    }

    #[test]
    fn features_group_by_method() {
        let doc = petstore();
        let ctx = context_for(&doc);
        let plans = plan_operations(&doc, &ctx.resolver).unwrap();
        let features = ModuleDocBuilder::new(&ctx, &plans).features_section();
        assert!(features.contains(" **GET**:\n - `list_pets` - List all pets"), "{features}");
        assert!(features.contains(" **POST**:\n - `create_pet` - `POST /pets`"), "{features}");
    }

    #[test]
    fn empty_document_has_placeholder_sections() {
        let doc = ApiDocument::default();
        let ctx = context_for(&doc);
        let builder = ModuleDocBuilder::new(&ctx, &[]);
        assert!(builder.features_section().contains("No operations defined"));
        assert!(builder.example_section().contains("No operations available"));
    }

    #[test]
    fn example_prefers_get_operation() {
        let doc = petstore();
        let ctx = context_for(&doc);
        let plans = plan_operations(&doc, &ctx.resolver).unwrap();
        let example = ModuleDocBuilder::new(&ctx, &plans).example_section();
        assert!(example.contains("client.list_pets().await?"), "{example}");
        assert!(!example.contains("create_pet"));
    }

    #[test]
    fn build_emits_inner_doc_attributes() {
        let doc = petstore();
        let ctx = context_for(&doc);
        let plans = plan_operations(&doc, &ctx.resolver).unwrap();
        let tokens = ModuleDocBuilder::new(&ctx, &plans).build().to_string();
        assert_eq!(tokens.matches("doc").count(), 7, "{tokens}");
        assert!(tokens.contains("## Authentication"));
    }
}
