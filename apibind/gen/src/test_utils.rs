//! Shared test utilities for apibind-gen tests.

use apibind_define::ApiDocument;
use proc_macro2::TokenStream;
use quote::format_ident;

use crate::codegen::UnitContext;
use crate::naming::normalize;
use crate::output::module_name;
use crate::resolver::TypeResolver;

/// Renders tokens with every whitespace character removed, so assertions do
/// not depend on how `prettyplease` wraps long lines.
pub fn compact(tokens: &TokenStream) -> String {
    tokens.to_string().chars().filter(|c| !c.is_whitespace()).collect()
}

/// Builds a unit context with default configuration, as if `doc` had been
/// read from `api.json`.
pub fn context_for(doc: &ApiDocument) -> UnitContext<'_> {
    let module = module_name(doc, "api.json");
    UnitContext {
        document: doc,
        resolver: TypeResolver::new(&doc.schemas),
        api_name: normalize(&module),
        module: format_ident!("{}", module),
        base: syn::parse_quote!(crate),
        type_vis: syn::parse_quote!(pub),
        member_vis: syn::parse_quote!(pub),
    }
}

/// Validates that generated code is syntactically correct.
///
/// ## Errors
///
/// Returns an error string if the generated code fails to parse.
pub fn validate_generated_code(tokens: &TokenStream) -> Result<(), String> {
    syn::parse2::<syn::File>(tokens.clone()).map_err(|e| e.to_string())?;
    Ok(())
}

/// Formats generated code using prettyplease.
///
/// ## Errors
///
/// Returns an error string if the code fails to parse.
pub fn format_generated_code(tokens: &TokenStream) -> Result<String, String> {
    let file = syn::parse2::<syn::File>(tokens.clone()).map_err(|e| e.to_string())?;
    Ok(prettyplease::unparse(&file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    #[test]
    fn compact_strips_whitespace() {
        assert_eq!(compact(&quote! { fn a(&self, b: u8) {} }), "fna(&self,b:u8){}");
    }

    #[test]
    fn context_uses_title_for_names() {
        let doc = crate::parser::parse_value(&serde_json::json!({
            "info": { "title": "Pet Store" },
            "paths": {}
        }))
        .unwrap();
        let ctx = context_for(&doc);
        assert_eq!(ctx.module.to_string(), "pet_store");
        assert_eq!(ctx.api_name, "PetStore");
    }

    #[test]
    fn context_falls_back_to_file_stem() {
        let doc = ApiDocument::default();
        let ctx = context_for(&doc);
        assert_eq!(ctx.module.to_string(), "api");
        assert_eq!(ctx.api_name, "Api");
    }

    #[test]
    fn invalid_code_is_reported() {
        assert!(validate_generated_code(&quote! { fn }).is_err());
        assert!(format_generated_code(&quote! { struct A; }).unwrap().contains("struct A;"));
    }
}
