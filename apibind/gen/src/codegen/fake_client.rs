//! Fake client generation (`fake_client.rs`).
//!
//! `Fake{Api}Client` implements the client trait without any I/O: every
//! method returns `Ok(None)` or `Ok(())`. It is meant as a starting point for
//! test doubles in code that consumes the generated client.

use proc_macro2::TokenStream;
use quote::quote;

use super::UnitContext;
use super::operation::OperationPlan;
use crate::errors::GeneratorError;

/// Generates the `fake_client.rs` unit.
///
/// ## Errors
///
/// Returns [`GeneratorError::CodeGenError`] if a resolved type fails to parse.
pub fn generate_fake_client(ctx: &UnitContext<'_>, plans: &[OperationPlan<'_>]) -> Result<TokenStream, GeneratorError> {
    let vis = &ctx.type_vis;
    let struct_name = ctx.api_ident("Fake", "Client");
    let trait_name = ctx.api_ident("", "Client");
    let result_name = ctx.api_ident("", "Result");
    let dtos = ctx.unit_path("dtos");
    let client = ctx.unit_path("client");

    let methods = plans
        .iter()
        .map(|plan| {
            let name = &plan.method_name;
            let params = plan.signature_params(true)?;
            let success = plan.success_type()?;
            let body = plan.empty_return();
            Ok(quote! {
                async fn #name(&self #(, #params)*) -> #result_name<#success> {
                    #body
                }
            })
        })
        .collect::<Result<Vec<_>, GeneratorError>>()?;

    let module_doc = format!(" Fake client for the {} API.", ctx.display_name());
    let struct_doc = format!(" [`{trait_name}`] implementation that performs no requests.");

    Ok(quote! {
        #![doc = #module_doc]

        #[allow(unused_imports)]
        use #dtos::*;
        use #client::{#result_name, #trait_name};

        #[doc = #struct_doc]
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #struct_name;

        impl #trait_name for #struct_name {
            #(#methods)*

            fn set_auth_header(&self, _scheme: &str, _parameter: Option<&str>) {}

            fn clear_auth_header(&self) {}
        }
    })
}
