//! Query string construction for generated client methods.
//!
//! Each query parameter is classified by its descriptor into a
//! [`QueryShape`]. The shape decides the code that turns the parameter into a
//! `name=value` pair: scalars are formatted and percent-encoded, lists are
//! encoded item by item and joined with commas, and empty values are left out
//! of the query string entirely.

use apibind_define::{TypeDescriptor, TypeKind};
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use tracing::warn;

use crate::resolver::{TypeResolver, map_primitive};

/// How a scalar value is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFormat {
    /// `ToString`, used for numbers, strings, dates, UUIDs and enums.
    Display,
    /// `to_rfc3339()`, used for `date-time`.
    Rfc3339,
}

/// The serialization shape of one query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    Scalar(ScalarFormat),
    OptionalScalar(ScalarFormat),
    List(ScalarFormat),
    OptionalList(ScalarFormat),
    /// Objects and references to non-enum schemas.
    Unsupported,
}

impl QueryShape {
    pub fn is_supported(self) -> bool {
        self != QueryShape::Unsupported
    }
}

/// Classifies a parameter schema.
///
/// `required` is the declared requiredness; an optional or nullable schema
/// produces one of the `Optional*` shapes, matching the `Option<…>` type the
/// parameter gets in the method signature.
///
/// ## Examples
///
/// ```
/// use apibind_define::{SchemaMap, TypeDescriptor};
/// use apibind_gen::query::{QueryShape, ScalarFormat, classify};
/// use apibind_gen::resolver::TypeResolver;
///
/// let schemas = SchemaMap::new();
/// let resolver = TypeResolver::new(&schemas);
///
/// let tags = TypeDescriptor::array(TypeDescriptor::primitive("string", None));
/// assert_eq!(classify(&tags, true, &resolver), QueryShape::List(ScalarFormat::Display));
///
/// let since = TypeDescriptor::primitive("string", Some("date-time"));
/// assert_eq!(classify(&since, false, &resolver), QueryShape::OptionalScalar(ScalarFormat::Rfc3339));
/// ```
pub fn classify(schema: &TypeDescriptor, required: bool, resolver: &TypeResolver<'_>) -> QueryShape {
    let optional = !required || schema.nullable;
    match &schema.kind {
        TypeKind::Array { items } => match scalar_format(items, resolver) {
            Some(format) if !items.nullable => {
                if optional {
                    QueryShape::OptionalList(format)
                } else {
                    QueryShape::List(format)
                }
            }
            _ => QueryShape::Unsupported,
        },
        _ => match scalar_format(schema, resolver) {
            Some(format) if optional => QueryShape::OptionalScalar(format),
            Some(format) => QueryShape::Scalar(format),
            None => QueryShape::Unsupported,
        },
    }
}

/// Returns the scalar format of a descriptor, ignoring nullability, or `None`
/// if values of the descriptor are not scalars.
pub(crate) fn scalar_format(schema: &TypeDescriptor, resolver: &TypeResolver<'_>) -> Option<ScalarFormat> {
    match &schema.kind {
        TypeKind::Primitive { type_name, format } => {
            let (rust_type, _) = map_primitive(type_name, format.as_deref()).ok()?;
            match rust_type {
                "serde_json::Value" => None,
                "chrono::DateTime<chrono::Utc>" => Some(ScalarFormat::Rfc3339),
                _ => Some(ScalarFormat::Display),
            }
        }
        TypeKind::Enum(_) => Some(ScalarFormat::Display),
        TypeKind::Reference { .. } if resolver.is_enum(schema) => Some(ScalarFormat::Display),
        TypeKind::Reference { .. } | TypeKind::Object(_) | TypeKind::Array { .. } => None,
    }
}

/// Renders one value to text according to its scalar format.
pub(crate) fn format_value(value: &TokenStream, format: ScalarFormat) -> TokenStream {
    match format {
        ScalarFormat::Display => quote! { #value.to_string() },
        ScalarFormat::Rfc3339 => quote! { #value.to_rfc3339() },
    }
}

/// One query parameter of an operation.
#[derive(Debug, Clone)]
pub struct QueryParam {
    /// Wire name, emitted percent-encoded.
    pub name: String,
    /// The method parameter holding the value.
    pub ident: Ident,
    pub shape: QueryShape,
}

/// The query parameters of one operation, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    params: Vec<QueryParam>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter. Unsupported parameters are kept in the plan so the
    /// method signature still lists them, but they never reach the wire.
    pub fn push(&mut self, operation: &str, param: QueryParam) {
        if !param.shape.is_supported() {
            warn!(
                operation,
                parameter = %param.name,
                "query parameter type is not supported and will be omitted from requests"
            );
        }
        self.params.push(param);
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Emits the statements that build `path_and_query` from `request_path`.
    pub fn to_tokens(&self) -> TokenStream {
        if self.params.is_empty() {
            return quote! {
                let path_and_query = request_path;
            };
        }

        let pushes = self.params.iter().map(|param| {
            let name = &param.name;
            let ident = &param.ident;
            let Some(value) = value_expr(ident, param.shape) else {
                return quote! { let _ = &#ident; };
            };
            quote! {
                {
                    let value = #value;
                    if !value.is_empty() {
                        request_query.push(format!("{}={}", encode_query_component(#name), value));
                    }
                }
            }
        });

        quote! {
            let mut request_query: Vec<String> = Vec::new();
            #(#pushes)*
            let path_and_query = if request_query.is_empty() {
                request_path
            } else {
                format!("{}?{}", request_path, request_query.join("&"))
            };
        }
    }
}

/// The expression producing the encoded value of one parameter.
fn value_expr(ident: &Ident, shape: QueryShape) -> Option<TokenStream> {
    let item = quote! { v };
    let expr = match shape {
        QueryShape::Scalar(format) => {
            let text = format_value(&quote! { #ident }, format);
            quote! { encode_query_component(&#text) }
        }
        QueryShape::OptionalScalar(format) => {
            let text = format_value(&item, format);
            quote! {
                #ident
                    .as_ref()
                    .map(|v| encode_query_component(&#text))
                    .unwrap_or_default()
            }
        }
        QueryShape::List(format) => {
            let text = format_value(&item, format);
            quote! {
                #ident
                    .iter()
                    .map(|v| encode_query_component(&#text))
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }
        QueryShape::OptionalList(format) => {
            let text = format_value(&item, format);
            quote! {
                #ident
                    .iter()
                    .flatten()
                    .map(|v| encode_query_component(&#text))
                    .collect::<Vec<_>>()
                    .join(",")
            }
        }
        QueryShape::Unsupported => return None,
    };
    Some(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::ident;
    use crate::test_utils::compact;
    use apibind_define::{EnumBase, EnumShape, ObjectShape, SchemaMap};

    fn schemas() -> SchemaMap {
        let mut schemas = SchemaMap::new();
        schemas.insert(
            "Status",
            TypeDescriptor::enumeration(EnumShape {
                base: EnumBase::String,
                format: None,
                values: vec!["available".to_string()],
            }),
        );
        schemas.insert("Pet", TypeDescriptor::object(ObjectShape::default()));
        schemas
    }

    #[test]
    fn classify_scalars() {
        let schemas = schemas();
        let resolver = TypeResolver::new(&schemas);
        let limit = TypeDescriptor::primitive("integer", None);
        assert_eq!(classify(&limit, true, &resolver), QueryShape::Scalar(ScalarFormat::Display));
        assert_eq!(
            classify(&limit, false, &resolver),
            QueryShape::OptionalScalar(ScalarFormat::Display)
        );
        assert_eq!(
            classify(&limit.to_nullable(), true, &resolver),
            QueryShape::OptionalScalar(ScalarFormat::Display)
        );
    }

    #[test]
    fn classify_enum_reference_is_scalar() {
        let schemas = schemas();
        let resolver = TypeResolver::new(&schemas);
        assert_eq!(
            classify(&TypeDescriptor::reference("Status"), true, &resolver),
            QueryShape::Scalar(ScalarFormat::Display)
        );
        let statuses = TypeDescriptor::array(TypeDescriptor::reference("Status"));
        assert_eq!(
            classify(&statuses, false, &resolver),
            QueryShape::OptionalList(ScalarFormat::Display)
        );
    }

    #[test]
    fn classify_unsupported() {
        let schemas = schemas();
        let resolver = TypeResolver::new(&schemas);
        let cases = [
            TypeDescriptor::reference("Pet"),
            TypeDescriptor::object(ObjectShape::default()),
            TypeDescriptor::primitive("object", None),
            TypeDescriptor::array(TypeDescriptor::reference("Pet")),
            TypeDescriptor::array(TypeDescriptor::primitive("string", None).to_nullable()),
            TypeDescriptor::array(TypeDescriptor::array(TypeDescriptor::primitive("string", None))),
        ];
        for schema in cases {
            assert_eq!(classify(&schema, true, &resolver), QueryShape::Unsupported, "{schema:?}");
        }
    }

    #[test]
    fn no_params_passes_path_through() {
        let code = compact(&QueryPlan::new().to_tokens());
        assert!(code.contains("letpath_and_query=request_path;"));
        assert!(!code.contains("request_query"));
    }

    #[test]
    fn list_values_are_joined_with_commas() {
        let mut plan = QueryPlan::new();
        plan.push(
            "GET /pets",
            QueryParam {
                name: "tags".to_string(),
                ident: ident("tags"),
                shape: QueryShape::List(ScalarFormat::Display),
            },
        );
        let code = compact(&plan.to_tokens());
        assert!(code.contains(".join(\",\")"), "{code}");
        assert!(code.contains("encode_query_component(\"tags\")"), "{code}");
        assert!(code.contains("if!value.is_empty()"), "{code}");
        assert!(code.contains("request_query.join(\"&\")"), "{code}");
    }

    #[test]
    fn date_times_use_rfc3339() {
        let mut plan = QueryPlan::new();
        plan.push(
            "GET /events",
            QueryParam {
                name: "since".to_string(),
                ident: ident("since"),
                shape: QueryShape::OptionalScalar(ScalarFormat::Rfc3339),
            },
        );
        let code = compact(&plan.to_tokens());
        assert!(code.contains("v.to_rfc3339()"), "{code}");
        assert!(code.contains("unwrap_or_default()"), "{code}");
    }

    #[test]
    fn unsupported_params_never_reach_the_query() {
        let mut plan = QueryPlan::new();
        plan.push(
            "GET /pets",
            QueryParam {
                name: "filter".to_string(),
                ident: ident("filter"),
                shape: QueryShape::Unsupported,
            },
        );
        let code = compact(&plan.to_tokens());
        assert!(code.contains("let_=&filter;"), "{code}");
        assert!(!code.contains("\"filter\""), "{code}");
    }

    #[test]
    #[tracing_test::traced_test]
    fn unsupported_params_are_logged() {
        let mut plan = QueryPlan::new();
        plan.push(
            "GET /pets",
            QueryParam {
                name: "filter".to_string(),
                ident: ident("filter"),
                shape: QueryShape::Unsupported,
            },
        );
        assert!(logs_contain("query parameter type is not supported and will be omitted from requests"));
        assert!(logs_contain("filter"));
    }
}
