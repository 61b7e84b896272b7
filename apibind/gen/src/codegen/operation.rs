//! Per-operation planning shared by the interface, live client and fake
//! client generators.
//!
//! An [`OperationPlan`] fixes everything the three generators must agree on:
//! the method name, the parameter list and its types, the return type, the
//! query string and the response dispatch.

use apibind_define::{ApiDocument, ApiEndpoint, ApiEndpointParameter, ParameterLocation};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::dispatch::DispatchPlan;
use crate::errors::{GeneratorError, SchemaFormatError};
use crate::naming::{UniqueNames, ident, member_name, unraw};
use crate::path_template::{build_format_string, extract_path_params};
use crate::query::{QueryParam, QueryPlan, QueryShape, classify, format_value, scalar_format};
use crate::resolver::{ResolvedType, TypeResolver};

/// Method names the generated client types define themselves.
const RESERVED_METHODS: &[&str] = &["new", "base", "with_bearer_token", "set_auth_header", "clear_auth_header"];

/// Locals of generated method bodies.
const RESERVED_LOCALS: &[&str] = &[
    "self",
    "request_path",
    "request_query",
    "request_headers",
    "request_body",
    "path_and_query",
    "response",
    "status",
    "value",
    "v",
];

/// Where a method parameter ends up in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Body,
    Path,
    Query,
    Header,
}

impl From<ParameterLocation> for ParamSource {
    fn from(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Path => ParamSource::Path,
            ParameterLocation::Query => ParamSource::Query,
            ParameterLocation::Header => ParamSource::Header,
        }
    }
}

/// One parameter of a generated method.
#[derive(Debug, Clone)]
pub struct OperationParam {
    pub ident: Ident,
    /// Wire name; `body` for the request body.
    pub wire_name: String,
    pub source: ParamSource,
    pub ty: ResolvedType,
    pub required: bool,
    pub description: Option<String>,
    /// Serialization shape for path, query and header parameters.
    pub shape: QueryShape,
}

/// Everything needed to emit one client method.
#[derive(Debug, Clone)]
pub struct OperationPlan<'a> {
    pub endpoint: &'a ApiEndpoint,
    pub method_name: Ident,
    /// Parameters in signature order.
    pub params: Vec<OperationParam>,
    pub dispatch: DispatchPlan,
    pub query: QueryPlan,
}

/// Plans every operation of a document, deduplicating method names.
///
/// ## Errors
///
/// Returns a [`SchemaFormatError`] with the operation's `METHOD path` as
/// context if any of its types cannot be resolved.
pub fn plan_operations<'a>(
    document: &'a ApiDocument,
    resolver: &TypeResolver<'_>,
) -> Result<Vec<OperationPlan<'a>>, SchemaFormatError> {
    let mut names = UniqueNames::with_reserved(RESERVED_METHODS.iter().copied());
    document
        .endpoints
        .iter()
        .map(|endpoint| OperationPlan::build(endpoint, resolver, &mut names))
        .collect()
}

/// Derives the base method name of an endpoint.
///
/// ## Examples
///
/// ```
/// use apibind_gen::codegen::operation::method_base_name;
///
/// assert_eq!(method_base_name(Some("listPets"), "GET", "/pets"), "list_pets");
/// assert_eq!(method_base_name(None, "GET", "/pets/{petId}"), "get_pets_pet_id");
/// ```
pub fn method_base_name(operation_id: Option<&str>, method: &str, path: &str) -> String {
    operation_id
        .map(|id| member_name(id, ""))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| member_name(&format!("{method}_{}", path.replace('/', "_")), "operation"))
}

impl<'a> OperationPlan<'a> {
    /// Plans one endpoint.
    ///
    /// ## Errors
    ///
    /// See [`plan_operations`].
    pub fn build(
        endpoint: &'a ApiEndpoint,
        resolver: &TypeResolver<'_>,
        method_names: &mut UniqueNames,
    ) -> Result<Self, SchemaFormatError> {
        let label = endpoint.label();
        Self::build_inner(endpoint, resolver, method_names).map_err(|e| e.with_context(label))
    }

    fn build_inner(
        endpoint: &'a ApiEndpoint,
        resolver: &TypeResolver<'_>,
        method_names: &mut UniqueNames,
    ) -> Result<Self, SchemaFormatError> {
        let base = method_base_name(
            endpoint.operation_id.as_deref(),
            &endpoint.method.to_string(),
            &endpoint.path,
        );
        let method_name = ident(&method_names.claim(&base));

        let mut locals = UniqueNames::with_reserved(RESERVED_LOCALS.iter().copied());
        let mut params = Vec::new();

        if let Some(schema) = endpoint.request_body.as_ref().and_then(|body| body.json_schema()) {
            let ty = resolver.resolve(schema).map_err(|e| e.with_context("requestBody"))?;
            params.push(OperationParam {
                ident: ident(&locals.claim("body")),
                wire_name: "body".to_string(),
                source: ParamSource::Body,
                ty,
                required: true,
                description: endpoint.request_body.as_ref().and_then(|body| body.description.clone()),
                shape: QueryShape::Unsupported,
            });
        }

        let mut declared: Vec<OperationParam> = Vec::new();
        for (i, parameter) in endpoint.parameters.iter().enumerate() {
            let param = plan_parameter(parameter, i, resolver, &mut locals)
                .map_err(|e| e.with_context(&parameter.name))?;
            declared.push(param);
        }

        for placeholder in extract_path_params(&endpoint.path) {
            let found = declared
                .iter()
                .any(|p| p.source == ParamSource::Path && p.wire_name == placeholder);
            if !found {
                return Err(SchemaFormatError::new(format!(
                    "Path placeholder '{{{placeholder}}}' has no matching path parameter."
                )));
            }
        }

        let mut query = QueryPlan::new();
        let label = endpoint.label();
        for param in declared.iter().filter(|p| p.source == ParamSource::Query) {
            query.push(
                &label,
                QueryParam {
                    name: param.wire_name.clone(),
                    ident: param.ident.clone(),
                    shape: param.shape,
                },
            );
        }

        // Stable: required first, each group in declaration order.
        declared.sort_by_key(|p| !p.required);
        params.extend(declared);

        let dispatch = DispatchPlan::for_endpoint(endpoint, resolver)?;

        Ok(Self {
            endpoint,
            method_name,
            params,
            dispatch,
            query,
        })
    }

    /// Returns the parameters carried in the given place.
    pub fn params_from(&self, source: ParamSource) -> impl Iterator<Item = &OperationParam> {
        self.params.iter().filter(move |p| p.source == source)
    }

    /// `name: Type` pairs for the signature, optionally prefixed with `_`.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::CodeGenError`] if a type fails to parse.
    pub fn signature_params(&self, unused: bool) -> Result<Vec<TokenStream>, GeneratorError> {
        self.params
            .iter()
            .map(|param| {
                let name = if unused {
                    format_ident!("_{}", unraw(&param.ident))
                } else {
                    param.ident.clone()
                };
                let ty = param.ty.to_type()?;
                Ok(quote! { #name: #ty })
            })
            .collect()
    }

    /// The success type wrapped by the API's result alias.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::CodeGenError`] if the type fails to parse.
    pub fn success_type(&self) -> Result<TokenStream, GeneratorError> {
        match self.dispatch.return_type() {
            Some(resolved) => {
                let ty = resolved.to_type()?;
                Ok(quote! { #ty })
            }
            None => Ok(quote! { () }),
        }
    }

    /// `Ok(None)` or `Ok(())`, depending on the return type.
    pub fn empty_return(&self) -> TokenStream {
        if self.dispatch.return_type().is_some() {
            quote! { Ok(None) }
        } else {
            quote! { Ok(()) }
        }
    }

    /// Doc attributes for the method: summary, description and parameters.
    pub fn doc_attrs(&self) -> TokenStream {
        let endpoint = self.endpoint;
        let mut lines = Vec::new();
        if let Some(summary) = endpoint.summary.as_deref() {
            lines.push(format!(" {}", summary.trim()));
            lines.push(String::new());
        }
        if let Some(description) = endpoint.description.as_deref() {
            lines.extend(description.trim().lines().map(|line| format!(" {line}")));
            lines.push(String::new());
        }
        lines.push(format!(" `{}`", endpoint.label()));

        let documented: Vec<_> = self
            .params
            .iter()
            .filter_map(|p| p.description.as_deref().map(|d| (unraw(&p.ident), d)))
            .collect();
        if !documented.is_empty() {
            lines.push(String::new());
            lines.push(" ## Parameters".to_string());
            lines.push(String::new());
            for (name, description) in documented {
                lines.push(format!(" - `{name}`: {}", description.trim()));
            }
        }

        let deprecated = endpoint.deprecated.then(|| quote! { #[deprecated] });
        quote! {
            #(#[doc = #lines])*
            #deprecated
        }
    }

    /// Emits the statement building `request_path`.
    pub fn path_tokens(&self) -> TokenStream {
        let path = &self.endpoint.path;
        let placeholders = extract_path_params(path);
        if placeholders.is_empty() {
            return quote! { let request_path = String::from(#path); };
        }

        let template = build_format_string(path);
        let args = placeholders.iter().filter_map(|name| {
            self.params_from(ParamSource::Path)
                .find(|p| p.wire_name == *name)
                .map(|p| {
                    let ident = &p.ident;
                    let text = match p.shape {
                        QueryShape::Scalar(format) | QueryShape::OptionalScalar(format) => {
                            format_value(&quote! { #ident }, format)
                        }
                        _ => quote! { #ident.to_string() },
                    };
                    quote! { encode_path_segment(&#text) }
                })
        });
        quote! { let request_path = format!(#template, #(#args),*); }
    }

    /// Emits the statements collecting `request_headers`, or nothing when the
    /// operation has no header parameters.
    pub fn header_tokens(&self) -> TokenStream {
        let headers: Vec<_> = self.params_from(ParamSource::Header).collect();
        if headers.is_empty() {
            return TokenStream::new();
        }
        let pushes = headers.iter().map(|param| {
            let name = &param.wire_name;
            let ident = &param.ident;
            let item = quote! { v };
            match param.shape {
                QueryShape::Scalar(format) => {
                    let text = format_value(&quote! { #ident }, format);
                    quote! { request_headers.push((#name, #text)); }
                }
                QueryShape::OptionalScalar(format) => {
                    let text = format_value(&item, format);
                    quote! {
                        if let Some(v) = &#ident {
                            request_headers.push((#name, #text));
                        }
                    }
                }
                QueryShape::List(format) => {
                    let text = format_value(&item, format);
                    quote! {
                        request_headers.push((#name, #ident.iter().map(|v| #text).collect::<Vec<_>>().join(",")));
                    }
                }
                QueryShape::OptionalList(format) => {
                    let text = format_value(&item, format);
                    quote! {
                        if let Some(values) = &#ident {
                            request_headers.push((#name, values.iter().map(|v| #text).collect::<Vec<_>>().join(",")));
                        }
                    }
                }
                QueryShape::Unsupported => quote! { let _ = &#ident; },
            }
        });
        quote! {
            let mut request_headers: Vec<(&'static str, String)> = Vec::new();
            #(#pushes)*
        }
    }

    /// Emits the statement building `request_body`.
    pub fn body_tokens(&self) -> TokenStream {
        match self.params_from(ParamSource::Body).next() {
            Some(param) => {
                let ident = &param.ident;
                quote! { let request_body = Some(serde_json::to_string(&#ident)?); }
            }
            None => quote! { let request_body: Option<String> = None; },
        }
    }
}

fn plan_parameter(
    parameter: &ApiEndpointParameter,
    index: usize,
    resolver: &TypeResolver<'_>,
    locals: &mut UniqueNames,
) -> Result<OperationParam, SchemaFormatError> {
    let source = ParamSource::from(parameter.location);
    let required = parameter.is_required();

    let (schema, shape) = match parameter.location {
        ParameterLocation::Path => {
            let schema = parameter.schema.to_non_nullable();
            let Some(format) = scalar_format(&schema, resolver) else {
                return Err(SchemaFormatError::new(format!(
                    "Path parameter '{}' must have a scalar schema.",
                    parameter.name
                )));
            };
            (schema, QueryShape::Scalar(format))
        }
        ParameterLocation::Query | ParameterLocation::Header => {
            let shape = classify(&parameter.schema, required, resolver);
            let schema = if required {
                parameter.schema.clone()
            } else {
                parameter.schema.to_nullable()
            };
            (schema, shape)
        }
    };

    let ty = resolver.resolve(&schema)?;
    let base = member_name(&parameter.name, &format!("param{}", index + 1));
    Ok(OperationParam {
        ident: ident(&locals.claim(&base)),
        wire_name: parameter.name.clone(),
        source,
        ty,
        required,
        description: parameter.description.clone(),
        shape,
    })
}
