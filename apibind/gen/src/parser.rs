//! OpenAPI document parsing.
//!
//! Walks the loosely-typed JSON document and produces the typed
//! intermediate representation from `apibind-define`. Parsing stops at the
//! first malformed fragment: a document either parses completely or yields a
//! single [`SchemaFormatError`] naming the offending schema, property or
//! operation.
//!
//! ## Recognized keys
//!
//! - `openapi`, `info`, `paths`, `security`
//! - `components.schemas` and `components.securitySchemes`
//! - `components.parameters`, `components.requestBodies` and
//!   `components.responses`, as `$ref` targets only
//!
//! Everything else is ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use apibind_define::{
    ApiDocument, ApiEndpoint, ApiEndpointParameter, ApiInfo, EnumBase, EnumShape, HttpMethod,
    ObjectShape, ParameterLocation, Property, RequestBody, Response, SchemaMap,
    SecuritySchemeDescriptor, StatusCode, TypeDescriptor, TypeKind, is_json_media_type,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{GeneratorError, SchemaFormatError};

type Object = Map<String, Value>;

/// Prefix of references into `components.schemas`.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Parses a document from its JSON text.
///
/// ## Errors
///
/// Returns [`GeneratorError::InvalidJson`] when `text` is not JSON and
/// [`GeneratorError::SchemaFormat`] when the document's shape is not
/// supported.
pub fn parse_document(text: &str, path: &str) -> Result<ApiDocument, GeneratorError> {
    let root: Value = serde_json::from_str(text).map_err(|source| GeneratorError::InvalidJson {
        path: path.to_string(),
        source,
    })?;
    Ok(parse_value(&root)?)
}

/// Parses an already-decoded JSON document.
///
/// ## Examples
///
/// ```
/// use apibind_gen::parser::parse_value;
/// use serde_json::json;
///
/// let doc = parse_value(&json!({
///     "openapi": "3.0.1",
///     "info": { "title": "Pet Store", "version": "1.0" },
///     "paths": {
///         "/pets": { "get": { "responses": { "200": { "description": "OK" } } } }
///     }
/// }))
/// .unwrap();
///
/// assert_eq!(doc.title(), Some("Pet Store"));
/// assert_eq!(doc.endpoints.len(), 1);
/// ```
///
/// ## Errors
///
/// Returns a [`SchemaFormatError`] for the first malformed fragment.
pub fn parse_value(root: &Value) -> Result<ApiDocument, SchemaFormatError> {
    let root = root
        .as_object()
        .ok_or_else(|| SchemaFormatError::new("Document root must be a JSON object."))?;
    let components = Components {
        root: root.get("components").and_then(Value::as_object),
    };

    let openapi = root
        .get("openapi")
        .or_else(|| root.get("swagger"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let info = root
        .get("info")
        .map(|info| serde_json::from_value::<ApiInfo>(info.clone()))
        .transpose()
        .map_err(|e| SchemaFormatError::new(format!("Invalid 'info' object: {e}")))?;

    let schemas = parse_schemas(&components)?;
    let endpoints = parse_paths(root, &components)?;
    let security_schemes = parse_security_schemes(&components)?;
    let security = parse_security_requirements(root);

    debug!(
        schemas = schemas.len(),
        endpoints = endpoints.len(),
        security_schemes = security_schemes.len(),
        "Parsed document"
    );

    Ok(ApiDocument {
        openapi,
        info,
        schemas,
        endpoints,
        security_schemes,
        security,
    })
}

/// Access to `components` sections for `$ref` resolution.
struct Components<'a> {
    root: Option<&'a Object>,
}

impl<'a> Components<'a> {
    fn section(&self, name: &str) -> Option<&'a Object> {
        self.root.and_then(|c| c.get(name)).and_then(Value::as_object)
    }

    /// Follows a `$ref` into the given components section, or returns the
    /// object itself when it is not a reference.
    fn resolve(&self, value: &'a Object, section: &str) -> Result<&'a Object, SchemaFormatError> {
        let Some(reference) = value.get("$ref") else {
            return Ok(value);
        };
        let reference = reference
            .as_str()
            .ok_or_else(|| SchemaFormatError::new("'$ref' must be a string."))?;
        let prefix = format!("#/components/{section}/");
        let name = reference.strip_prefix(&prefix).ok_or_else(|| {
            SchemaFormatError::new(format!(
                "Reference '{reference}' must point into '{prefix}'."
            ))
        })?;
        self.section(section)
            .and_then(|entries| entries.get(name))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                SchemaFormatError::new(format!("Reference '{reference}' could not be resolved."))
            })
    }
}

fn string_field(object: &Object, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_schemas(components: &Components<'_>) -> Result<SchemaMap, SchemaFormatError> {
    let mut schemas = SchemaMap::new();
    let Some(entries) = components.section("schemas") else {
        return Ok(schemas);
    };

    for (name, value) in entries {
        let Some(schema) = value.as_object() else {
            debug!(schema = %name, "Skipping schema that is not a JSON object");
            continue;
        };
        let descriptor = parse_type_descriptor(schema).map_err(|e| e.with_context(name))?;
        match &descriptor.kind {
            TypeKind::Object(_) | TypeKind::Array { .. } | TypeKind::Enum(_) => {}
            TypeKind::Primitive { type_name, .. } => {
                return Err(SchemaFormatError::new(format!(
                    "Type '{type_name}' is not supported as top level type."
                ))
                .with_context(name));
            }
            TypeKind::Reference { target } => {
                return Err(SchemaFormatError::new(format!(
                    "Reference to '{target}' is not supported as top level type."
                ))
                .with_context(name));
            }
        }
        schemas.insert(name.clone(), descriptor);
    }

    Ok(schemas)
}

/// Parses one schema fragment by recursive descent.
///
/// ## Errors
///
/// Returns a [`SchemaFormatError`] when the fragment is missing a field its
/// shape requires (e.g. `items` for arrays) or uses an unsupported shape.
pub fn parse_type_descriptor(schema: &Object) -> Result<TypeDescriptor, SchemaFormatError> {
    let (type_name, type_nullable) = parse_type_field(schema)?;
    let nullable = type_nullable
        || schema
            .get("nullable")
            .and_then(Value::as_bool)
            .unwrap_or(false);

    let kind = if let Some(reference) = schema.get("$ref") {
        TypeKind::Reference {
            target: parse_schema_ref(reference)?,
        }
    } else if let Some(target) = single_composed_ref(schema)? {
        TypeKind::Reference { target }
    } else if let Some(values) = schema.get("enum") {
        TypeKind::Enum(parse_enum(type_name.as_deref(), schema, values)?)
    } else {
        match type_name.as_deref() {
            Some("array") => {
                let items = schema
                    .get("items")
                    .and_then(Value::as_object)
                    .ok_or_else(|| SchemaFormatError::new("array type requires items type to be defined"))?;
                TypeKind::Array {
                    items: Box::new(parse_type_descriptor(items).map_err(|e| e.with_context("items"))?),
                }
            }
            Some("object") => TypeKind::Object(parse_object(schema)?),
            Some(other) => TypeKind::Primitive {
                type_name: other.to_string(),
                format: string_field(schema, "format"),
            },
            None if schema.contains_key("properties") => TypeKind::Object(parse_object(schema)?),
            None => {
                if ["allOf", "oneOf", "anyOf"].iter().any(|k| schema.contains_key(*k)) {
                    debug!("Treating composed schema as a free-form object");
                }
                TypeKind::Object(ObjectShape::default())
            }
        }
    };

    Ok(TypeDescriptor::new(kind)
        .with_nullable(nullable)
        .with_description(string_field(schema, "description")))
}

/// Reads `type`, accepting the OpenAPI 3.1 `[T, "null"]` form.
fn parse_type_field(schema: &Object) -> Result<(Option<String>, bool), SchemaFormatError> {
    match schema.get("type") {
        None | Some(Value::Null) => Ok((None, false)),
        Some(Value::String(name)) => Ok((Some(name.clone()), false)),
        Some(Value::Array(types)) => {
            let mut nullable = false;
            let mut names = Vec::new();
            for entry in types {
                match entry.as_str() {
                    Some("null") => nullable = true,
                    Some(name) => names.push(name),
                    None => return Err(SchemaFormatError::new("'type' entries must be strings.")),
                }
            }
            match names.as_slice() {
                [] => Ok((None, nullable)),
                [single] => Ok((Some((*single).to_string()), nullable)),
                _ => Err(SchemaFormatError::new(format!(
                    "Union types are not supported ({}).",
                    names.join(", ")
                ))),
            }
        }
        Some(other) => Err(SchemaFormatError::new(format!(
            "'type' must be a string or an array of strings, found {other}."
        ))),
    }
}

fn parse_schema_ref(reference: &Value) -> Result<String, SchemaFormatError> {
    let reference = reference
        .as_str()
        .ok_or_else(|| SchemaFormatError::new("'$ref' must be a string."))?;
    reference
        .strip_prefix(SCHEMA_REF_PREFIX)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SchemaFormatError::new(format!("Unsupported reference '{reference}'.")))
}

/// Treats `allOf`/`oneOf`/`anyOf` with a single `$ref` member as that
/// reference.
fn single_composed_ref(schema: &Object) -> Result<Option<String>, SchemaFormatError> {
    for key in ["allOf", "oneOf", "anyOf"] {
        if let Some(Value::Array(members)) = schema.get(key)
            && let [member] = members.as_slice()
            && let Some(reference) = member.get("$ref")
        {
            return parse_schema_ref(reference).map(Some);
        }
    }
    Ok(None)
}

fn parse_enum(
    type_name: Option<&str>,
    schema: &Object,
    values: &Value,
) -> Result<EnumShape, SchemaFormatError> {
    let base = match type_name {
        Some("string") => EnumBase::String,
        Some("integer") => EnumBase::Integer,
        other => {
            return Err(SchemaFormatError::new(format!(
                "Cannot generate enum with non-integer or non-string schema (type: {}).",
                other.unwrap_or("none")
            )));
        }
    };
    let values = values
        .as_array()
        .ok_or_else(|| SchemaFormatError::new("'enum' values must be an array."))?;
    let literals: Vec<String> = values
        .iter()
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    if literals.is_empty() {
        return Err(SchemaFormatError::new("enum type requires at least one enum value"));
    }

    Ok(EnumShape {
        base,
        format: string_field(schema, "format"),
        values: literals,
    })
}

fn parse_object(schema: &Object) -> Result<ObjectShape, SchemaFormatError> {
    let mut properties = Vec::new();
    if let Some(entries) = schema.get("properties").and_then(Value::as_object) {
        for (name, value) in entries {
            let Some(property) = value.as_object() else {
                debug!(property = %name, "Skipping property schema that is not a JSON object");
                continue;
            };
            let schema = parse_type_descriptor(property).map_err(|e| e.with_context(name))?;
            properties.push(Property {
                name: name.clone(),
                schema,
            });
        }
    }

    let required: Vec<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    for name in &required {
        if !properties.iter().any(|p| &p.name == name) {
            debug!(property = %name, "Ignoring required name with no matching property");
        }
    }

    Ok(ObjectShape::new(properties, required))
}

fn parse_paths<'a>(
    root: &'a Object,
    components: &Components<'a>,
) -> Result<Vec<ApiEndpoint>, SchemaFormatError> {
    let mut endpoints = Vec::new();
    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        return Ok(endpoints);
    };

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            debug!(path = %path, "Skipping path item that is not a JSON object");
            continue;
        };
        let shared = parse_parameters(item.get("parameters"), components).map_err(|e| e.with_context(path))?;

        for (key, operation) in item {
            let Ok(method) = HttpMethod::from_str(key) else {
                continue;
            };
            let Some(operation) = operation.as_object() else {
                continue;
            };
            let endpoint = parse_endpoint(method, path, operation, &shared, components)
                .map_err(|e| e.with_context(format!("{method} {path}")))?;
            endpoints.push(endpoint);
        }
    }

    Ok(endpoints)
}

fn parse_endpoint<'a>(
    method: HttpMethod,
    path: &str,
    operation: &'a Object,
    shared: &[ApiEndpointParameter],
    components: &Components<'a>,
) -> Result<ApiEndpoint, SchemaFormatError> {
    let own = parse_parameters(operation.get("parameters"), components)?;
    let mut parameters: Vec<ApiEndpointParameter> = shared
        .iter()
        .filter(|inherited| {
            !own.iter()
                .any(|p| p.name == inherited.name && p.location == inherited.location)
        })
        .cloned()
        .collect();
    parameters.extend(own);

    let request_body = operation
        .get("requestBody")
        .map(|body| {
            let body = body
                .as_object()
                .ok_or_else(|| SchemaFormatError::new("'requestBody' must be an object."))?;
            parse_request_body(components.resolve(body, "requestBodies")?)
        })
        .transpose()?;

    let responses = parse_responses(operation.get("responses"), components)?;

    let tags = operation.get("tags").and_then(Value::as_array).map(|tags| {
        tags.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    });

    Ok(ApiEndpoint {
        method,
        path: path.to_string(),
        parameters,
        request_body,
        responses,
        operation_id: string_field(operation, "operationId"),
        tags,
        summary: string_field(operation, "summary"),
        description: string_field(operation, "description"),
        deprecated: operation
            .get("deprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn parse_parameters<'a>(
    value: Option<&'a Value>,
    components: &Components<'a>,
) -> Result<Vec<ApiEndpointParameter>, SchemaFormatError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let entries = value
        .as_array()
        .ok_or_else(|| SchemaFormatError::new("'parameters' must be an array."))?;

    entries
        .iter()
        .map(|entry| {
            let entry = entry
                .as_object()
                .ok_or_else(|| SchemaFormatError::new("Api endpoint parameter must be an object."))?;
            parse_parameter(components.resolve(entry, "parameters")?)
        })
        .collect()
}

fn parse_parameter(parameter: &Object) -> Result<ApiEndpointParameter, SchemaFormatError> {
    let name = string_field(parameter, "name")
        .ok_or_else(|| SchemaFormatError::new("'name' value not provided for api endpoint parameter."))?;
    let location = parameter.get("in").and_then(Value::as_str).ok_or_else(|| {
        SchemaFormatError::new("'in' value not provided for api endpoint parameter.").with_context(&name)
    })?;
    let location = ParameterLocation::from_str(location).map_err(|_| {
        SchemaFormatError::new(format!(
            "'in' value '{location}' is not supported for api endpoint parameter."
        ))
        .with_context(&name)
    })?;
    let schema = parameter.get("schema").and_then(Value::as_object).ok_or_else(|| {
        SchemaFormatError::new("'schema' value not provided for api endpoint parameter.").with_context(&name)
    })?;
    let schema = parse_type_descriptor(schema).map_err(|e| e.with_context(&name))?;

    Ok(ApiEndpointParameter {
        name,
        location,
        schema,
        required: parameter.get("required").and_then(Value::as_bool),
        description: string_field(parameter, "description"),
    })
}

fn parse_request_body(body: &Object) -> Result<RequestBody, SchemaFormatError> {
    let content = body
        .get("content")
        .ok_or_else(|| SchemaFormatError::new("'content' value not provided for request body."))?;
    Ok(RequestBody {
        content: parse_content(content).map_err(|e| e.with_context("requestBody"))?,
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: string_field(body, "description"),
    })
}

/// Parses a media-type map. JSON media types must carry a schema; other
/// media types without one are skipped.
fn parse_content(content: &Value) -> Result<BTreeMap<String, TypeDescriptor>, SchemaFormatError> {
    let entries = content
        .as_object()
        .ok_or_else(|| SchemaFormatError::new("'content' must be an object."))?;

    let mut parsed = BTreeMap::new();
    for (media_type, entry) in entries {
        match entry.get("schema").and_then(Value::as_object) {
            Some(schema) => {
                let descriptor = parse_type_descriptor(schema).map_err(|e| e.with_context(media_type))?;
                parsed.insert(media_type.clone(), descriptor);
            }
            None if is_json_media_type(media_type) => {
                return Err(SchemaFormatError::new("Schema for content is not defined.").with_context(media_type));
            }
            None => debug!(media_type = %media_type, "Skipping content without a schema"),
        }
    }
    Ok(parsed)
}

fn parse_responses<'a>(
    value: Option<&'a Value>,
    components: &Components<'a>,
) -> Result<BTreeMap<StatusCode, Response>, SchemaFormatError> {
    let entries = value
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaFormatError::new("Responses for api endpoint were not provided."))?;

    let mut responses = BTreeMap::new();
    for (key, value) in entries {
        let Ok(status_code) = StatusCode::from_str(key) else {
            debug!(status = %key, "Skipping response key that is not an HTTP status code");
            continue;
        };
        let response = value
            .as_object()
            .ok_or_else(|| SchemaFormatError::new("Response must be an object.").with_context(key))?;
        let response = components
            .resolve(response, "responses")
            .map_err(|e| e.with_context(key))?;
        let content = response
            .get("content")
            .map(parse_content)
            .transpose()
            .map_err(|e| e.with_context(key))?;

        responses.insert(
            status_code,
            Response {
                status_code,
                content,
                description: string_field(response, "description"),
            },
        );
    }

    if responses.is_empty() {
        return Err(SchemaFormatError::new(
            "Responses for api endpoint do not declare any HTTP status code.",
        ));
    }
    Ok(responses)
}

fn parse_security_schemes(
    components: &Components<'_>,
) -> Result<BTreeMap<String, SecuritySchemeDescriptor>, SchemaFormatError> {
    let Some(entries) = components.section("securitySchemes") else {
        return Ok(BTreeMap::new());
    };
    entries
        .iter()
        .map(|(name, value)| {
            serde_json::from_value::<SecuritySchemeDescriptor>(value.clone())
                .map(|scheme| (name.clone(), scheme))
                .map_err(|e| SchemaFormatError::new(format!("Invalid security scheme: {e}")).with_context(name))
        })
        .collect()
}

/// Collects the scheme names of the top-level `security` requirement.
fn parse_security_requirements(root: &Object) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let requirements = root.get("security").and_then(Value::as_array);
    for requirement in requirements.into_iter().flatten() {
        for name in requirement.as_object().into_iter().flat_map(Map::keys) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}
