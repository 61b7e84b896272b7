//! Client interface generation (`client.rs`).
//!
//! The interface unit holds the `{Api}Client` trait implemented by both the
//! live and the fake client, the `{Api}ErrorPayload` enum that carries typed
//! error bodies, and the `{Api}Result<T>` alias used by every method.

use std::collections::BTreeMap;

use proc_macro2::{Ident, TokenStream};
use quote::quote;

use super::UnitContext;
use super::operation::OperationPlan;
use crate::errors::GeneratorError;
use crate::naming::{UniqueNames, ident, pascal_name};
use crate::resolver::ResolvedType;

/// Maps each distinct typed-error payload to its `{Api}ErrorPayload` variant.
#[derive(Debug, Clone, Default)]
pub struct PayloadVariants {
    variants: BTreeMap<String, (Ident, ResolvedType)>,
}

impl PayloadVariants {
    /// Collects payload types from every operation's dispatch plan.
    pub fn collect(plans: &[OperationPlan<'_>]) -> Self {
        let mut scope = UniqueNames::new();
        let mut variants = BTreeMap::new();
        for payload in plans.iter().flat_map(|plan| plan.dispatch.error_payloads()) {
            if variants.contains_key(&payload.name) {
                continue;
            }
            let base = pascal_name(&payload.name.replace(|c: char| !c.is_ascii_alphanumeric(), "_"), "Payload");
            let variant = ident(&scope.claim(&base));
            variants.insert(payload.name.clone(), (variant, payload.clone()));
        }
        Self { variants }
    }

    /// Returns the variant wrapping the given payload type.
    pub fn variant(&self, payload: &ResolvedType) -> Option<&Ident> {
        self.variants.get(&payload.name).map(|(variant, _)| variant)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &(Ident, ResolvedType)> {
        self.variants.values()
    }
}

/// Generates the `client.rs` unit.
///
/// ## Errors
///
/// Returns [`GeneratorError::CodeGenError`] if a resolved type fails to parse.
pub fn generate_client_trait(
    ctx: &UnitContext<'_>,
    plans: &[OperationPlan<'_>],
    payloads: &PayloadVariants,
) -> Result<TokenStream, GeneratorError> {
    let vis = &ctx.type_vis;
    let trait_name = ctx.api_ident("", "Client");
    let payload_name = ctx.api_ident("", "ErrorPayload");
    let result_name = ctx.api_ident("", "Result");
    let dtos = ctx.unit_path("dtos");
    let runtime = ctx.runtime_path();

    let payload_variants = payloads
        .iter()
        .map(|(variant, payload)| {
            let ty = payload.to_type()?;
            Ok(quote! { #variant(#ty) })
        })
        .collect::<Result<Vec<_>, GeneratorError>>()?;

    let methods = plans
        .iter()
        .map(|plan| {
            let docs = plan.doc_attrs();
            let name = &plan.method_name;
            let params = plan.signature_params(false)?;
            let success = plan.success_type()?;
            Ok(quote! {
                #docs
                fn #name(&self #(, #params)*) -> impl std::future::Future<Output = #result_name<#success>> + Send;
            })
        })
        .collect::<Result<Vec<_>, GeneratorError>>()?;

    let module_doc = format!(" Client interface for the {} API.", ctx.display_name());
    let trait_doc = format!(" Operations of the {} API.", ctx.display_name());
    let payload_doc = " Typed bodies of declared error responses.";
    let result_doc = format!(" Result of a `{trait_name}` call.");

    Ok(quote! {
        #![doc = #module_doc]

        #[allow(unused_imports)]
        use #dtos::*;
        use #runtime::ClientError;

        #[doc = #payload_doc]
        #[derive(Debug, Clone, PartialEq)]
        #vis enum #payload_name {
            #(#payload_variants,)*
        }

        #[doc = #result_doc]
        #vis type #result_name<T> = Result<T, ClientError<#payload_name>>;

        #[doc = #trait_doc]
        #vis trait #trait_name {
            #(#methods)*

            /// Sets the `Authorization` header sent with every request.
            fn set_auth_header(&self, scheme: &str, parameter: Option<&str>);

            /// Stops sending the `Authorization` header.
            fn clear_auth_header(&self);
        }
    })
}
