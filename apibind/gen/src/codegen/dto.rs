//! Data transfer type generation.
//!
//! Every top-level schema becomes one Rust item in `dtos.rs`:
//!
//! - objects become structs with a `new()` taking the required properties
//! - string enums become fieldless enums with serde renames
//! - integer enums become `#[repr(i64)]` enums serialized as numbers
//! - arrays become transparent newtypes over `Vec`

use std::collections::BTreeSet;

use apibind_define::{EnumBase, EnumShape, ObjectShape, TypeDescriptor, TypeKind};
use proc_macro2::{Ident, Literal, TokenStream};
use quote::quote;
use tracing::{debug, warn};

use super::{UnitContext, doc_attrs};
use crate::errors::{GeneratorError, SchemaFormatError};
use crate::naming::{UniqueNames, ident, member_name, pascal_name};
use crate::resolver::ResolvedType;

/// Generates the `dtos.rs` unit.
///
/// ## Errors
///
/// Returns a schema format error naming the schema (and property) whose type
/// cannot be generated.
pub fn generate_dtos(ctx: &UnitContext<'_>) -> Result<TokenStream, GeneratorError> {
    let items = ctx
        .resolver
        .schemas()
        .iter()
        .map(|(key, descriptor)| generate_schema(ctx, key, descriptor).map_err(|e| e.with_context(key)))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(module = %ctx.module, count = items.len(), "Generated data transfer types");

    let doc = format!(" Data transfer types for the {} API.", ctx.display_name());
    Ok(quote! {
        #![doc = #doc]

        #(#items)*
    })
}

fn generate_schema(ctx: &UnitContext<'_>, key: &str, descriptor: &TypeDescriptor) -> Result<TokenStream, GeneratorError> {
    let name = ident(ctx.resolver.type_name(key)?);
    let docs = doc_attrs(descriptor.description.as_deref());
    let item = match &descriptor.kind {
        TypeKind::Object(shape) => generate_struct(ctx, key, &name, shape)?,
        TypeKind::Enum(shape) => match shape.base {
            EnumBase::String => generate_string_enum(ctx, key, &name, shape),
            EnumBase::Integer => generate_integer_enum(ctx, key, &name, shape)?,
        },
        TypeKind::Array { items } => generate_array(ctx, &name, items)?,
        TypeKind::Primitive { type_name, .. } => {
            return Err(SchemaFormatError::new(format!(
                "Type '{type_name}' is not supported as top level type."
            ))
            .into());
        }
        TypeKind::Reference { .. } => {
            return Err(SchemaFormatError::new("Type 'reference' is not supported as top level type.").into());
        }
    };
    Ok(quote! {
        #docs
        #item
    })
}

fn generate_struct(
    ctx: &UnitContext<'_>,
    key: &str,
    name: &Ident,
    shape: &ObjectShape,
) -> Result<TokenStream, GeneratorError> {
    let vis = &ctx.type_vis;
    let member_vis = &ctx.member_vis;
    let mut scope = UniqueNames::new();

    let mut fields = Vec::new();
    let mut ctor_params = Vec::new();
    let mut ctor_inits = Vec::new();

    for (i, property) in shape.properties().iter().enumerate() {
        let resolved = ctx.resolver.resolve_property(key, property)?;
        let field = ident(&scope.claim(&member_name(&property.name, &format!("field{}", i + 1))));
        let wire = &property.name;
        let docs = doc_attrs(property.schema.description.as_deref());

        if shape.is_required(&property.name) {
            let ty = resolved.to_type()?;
            fields.push(quote! {
                #docs
                #[serde(rename = #wire)]
                #member_vis #field: #ty
            });
            ctor_params.push(quote! { #field: #ty });
            ctor_inits.push(quote! { #field });
        } else if resolved.reference_like || property.schema.nullable {
            let ty = if property.schema.nullable {
                resolved.to_type()?
            } else {
                ResolvedType {
                    name: format!("Option<{}>", resolved.name),
                    reference_like: true,
                }
                .to_type()?
            };
            fields.push(quote! {
                #docs
                #[serde(rename = #wire, default, skip_serializing_if = "Option::is_none")]
                #member_vis #field: #ty
            });
            ctor_inits.push(quote! { #field: None });
        } else {
            let ty = resolved.to_type()?;
            fields.push(quote! {
                #docs
                #[serde(rename = #wire, default)]
                #member_vis #field: #ty
            });
            ctor_inits.push(quote! { #field: Default::default() });
        }
    }

    let ctor_doc = if ctor_params.is_empty() {
        format!(" Creates a `{name}` with every property unset.")
    } else {
        format!(" Creates a `{name}` from its required properties.")
    };

    Ok(quote! {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #vis struct #name {
            #(#fields,)*
        }

        impl #name {
            #[doc = #ctor_doc]
            #[allow(clippy::too_many_arguments)]
            #member_vis fn new(#(#ctor_params),*) -> Self {
                Self {
                    #(#ctor_inits,)*
                }
            }
        }
    })
}

fn generate_string_enum(ctx: &UnitContext<'_>, key: &str, name: &Ident, shape: &EnumShape) -> TokenStream {
    let vis = &ctx.type_vis;
    let mut seen = BTreeSet::new();
    let mut scope = UniqueNames::new();
    let mut variants = Vec::new();
    let mut literals = Vec::new();

    for (i, literal) in shape.values.iter().enumerate() {
        if !seen.insert(literal.as_str()) {
            warn!(schema = key, value = %literal, "Skipping duplicate enum value");
            continue;
        }
        variants.push(ident(&scope.claim(&pascal_name(literal, &format!("Value{}", i + 1)))));
        literals.push(literal);
    }

    quote! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #vis enum #name {
            #(
                #[serde(rename = #literals)]
                #variants,
            )*
        }

        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    #(Self::#variants => #literals,)*
                })
            }
        }
    }
}

fn generate_integer_enum(
    ctx: &UnitContext<'_>,
    key: &str,
    name: &Ident,
    shape: &EnumShape,
) -> Result<TokenStream, SchemaFormatError> {
    let vis = &ctx.type_vis;
    let mut seen = BTreeSet::new();
    let mut scope = UniqueNames::new();
    let mut variants = Vec::new();
    let mut values = Vec::new();

    for literal in &shape.values {
        let value: i64 = literal
            .trim()
            .parse()
            .map_err(|_| SchemaFormatError::new(format!("Enum value '{literal}' is not an integer.")))?;
        if !seen.insert(value) {
            warn!(schema = key, value, "Skipping duplicate enum value");
            continue;
        }
        let base = pascal_name(&value.to_string().replace('-', "minus_"), "Value");
        variants.push(ident(&scope.claim(&base)));
        values.push(int_literal(value));
    }

    let unknown = format!("unknown {name} value {{other}}");
    Ok(quote! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i64)]
        #vis enum #name {
            #(#variants = #values,)*
        }

        impl serde::Serialize for #name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i64(*self as i64)
            }
        }

        impl<'de> serde::Deserialize<'de> for #name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match <i64 as serde::Deserialize>::deserialize(deserializer)? {
                    #(#values => Ok(Self::#variants),)*
                    other => Err(serde::de::Error::custom(format!(#unknown))),
                }
            }
        }

        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", *self as i64)
            }
        }
    })
}

fn generate_array(ctx: &UnitContext<'_>, name: &Ident, items: &TypeDescriptor) -> Result<TokenStream, GeneratorError> {
    let vis = &ctx.type_vis;
    let member_vis = &ctx.member_vis;
    let item = ctx
        .resolver
        .resolve(items)
        .map_err(|e| e.with_context("items"))?
        .to_type()?;

    Ok(quote! {
        #[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        #vis struct #name(#member_vis Vec<#item>);

        impl std::ops::Deref for #name {
            type Target = Vec<#item>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for #name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<Vec<#item>> for #name {
            fn from(items: Vec<#item>) -> Self {
                Self(items)
            }
        }

        impl FromIterator<#item> for #name {
            fn from_iter<I: IntoIterator<Item = #item>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }

        impl IntoIterator for #name {
            type Item = #item;
            type IntoIter = std::vec::IntoIter<#item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }
    })
}

/// An integer literal token, with negative values emitted as `- n`.
fn int_literal(value: i64) -> TokenStream {
    let literal = Literal::u64_unsuffixed(value.unsigned_abs());
    if value < 0 {
        quote! { -#literal }
    } else {
        quote! { #literal }
    }
}
