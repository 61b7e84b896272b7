//! Code generation modules for apibind.
//!
//! Each submodule produces one kind of generated unit as a
//! `proc_macro2::TokenStream`. The streams are validated and formatted by
//! [`crate::output`].
//!
//! ## Submodules
//!
//! - [`dto`] - Data transfer types (`dtos.rs`)
//! - [`operation`] - Per-operation planning shared by the client generators
//! - [`client_trait`] - Client interface, error payload enum and result alias (`client.rs`)
//! - [`http_client`] - Live client over the runtime base (`http_client.rs`)
//! - [`fake_client`] - Test double returning empty values (`fake_client.rs`)
//! - [`module_docs`] - Module documentation for the per-document `mod.rs`
//! - [`runtime`] - The once-per-run runtime unit (`runtime.rs`)

pub mod client_trait;
pub mod dto;
pub mod fake_client;
pub mod http_client;
pub mod module_docs;
pub mod operation;
pub mod runtime;

use apibind_define::ApiDocument;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

pub use client_trait::generate_client_trait;
pub use dto::generate_dtos;
pub use fake_client::generate_fake_client;
pub use http_client::generate_http_client;
pub use module_docs::ModuleDocBuilder;
pub use operation::{OperationPlan, plan_operations};
pub use runtime::generate_runtime;

use crate::resolver::TypeResolver;

/// Shared state for generating the units of one document.
#[derive(Debug)]
pub struct UnitContext<'a> {
    pub document: &'a ApiDocument,
    pub resolver: TypeResolver<'a>,
    /// Module the document's units live in.
    pub module: Ident,
    /// PascalCase prefix of the generated client types.
    pub api_name: String,
    /// Path of the module that holds `runtime` and the document modules.
    pub base: syn::Path,
    pub type_vis: syn::Visibility,
    pub member_vis: syn::Visibility,
}

impl<'a> UnitContext<'a> {
    /// Builds an identifier from the API name and a suffix, e.g.
    /// `PetStoreClient`.
    pub fn api_ident(&self, prefix: &str, suffix: &str) -> Ident {
        format_ident!("{}{}{}", prefix, self.api_name, suffix)
    }

    /// `{base}::{module}::{unit}`.
    pub fn unit_path(&self, unit: &str) -> TokenStream {
        let base = &self.base;
        let module = &self.module;
        let unit = format_ident!("{}", unit);
        quote! { #base::#module::#unit }
    }

    /// `{base}::runtime`.
    pub fn runtime_path(&self) -> TokenStream {
        let base = &self.base;
        quote! { #base::runtime }
    }

    /// Human readable API name for docs.
    pub fn display_name(&self) -> String {
        self.document
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| self.api_name.clone())
    }
}

/// Turns free-form text into `#[doc = ...]` attributes, one per line.
pub(crate) fn doc_attrs(text: Option<&str>) -> TokenStream {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return TokenStream::new();
    };
    let lines = text.lines().map(|line| format!(" {}", line.trim_end()));
    quote! { #(#[doc = #lines])* }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_attrs_skip_empty_text() {
        assert!(doc_attrs(None).is_empty());
        assert!(doc_attrs(Some("  \n ")).is_empty());
    }

    #[test]
    fn doc_attrs_one_attribute_per_line() {
        let tokens = doc_attrs(Some("First line\nSecond line")).to_string();
        assert_eq!(tokens.matches("doc").count(), 2);
        assert!(tokens.contains("\" First line\""));
    }
}
