//! apibind Definition Library
//!
//! This crate provides the intermediate representation produced by parsing an
//! OpenAPI document. The `apibind-gen` crate parses documents into these types
//! and generates strongly-typed Rust clients from them.
//!
//! ## Core Types
//!
//! ### Schemas
//!
//! - [`TypeDescriptor`] - A schema fragment: kind, nullability and description
//! - [`TypeKind`] - Tagged union of primitive, object, array, enum and reference shapes
//! - [`ObjectShape`] / [`Property`] - Object properties and the required set
//! - [`EnumShape`] / [`EnumBase`] - Enum literals over `string` or `integer`
//! - [`SchemaMap`] - Ordered top-level schemas from `components.schemas`
//!
//! ### Operations
//!
//! - [`ApiEndpoint`] - One HTTP operation (method × path)
//! - [`ApiEndpointParameter`] / [`ParameterLocation`] - Query, path and header parameters
//! - [`RequestBody`] / [`Response`] / [`StatusCode`] - Payload schemas per media type
//! - [`HttpMethod`] - HTTP methods recognized as path item keys
//!
//! ### Documents
//!
//! - [`ApiDocument`] / [`ApiInfo`] - A whole parsed document
//! - [`SecuritySchemeDescriptor`] - Declared authentication schemes
//!
//! ## Examples
//!
//! ```
//! use apibind_define::{ObjectShape, Property, SchemaMap, TypeDescriptor};
//!
//! let pet = ObjectShape::new(
//!     vec![
//!         Property { name: "id".to_string(), schema: TypeDescriptor::primitive("integer", Some("int64")) },
//!         Property { name: "owner".to_string(), schema: TypeDescriptor::reference("Person") },
//!     ],
//!     ["id".to_string()],
//! );
//!
//! let mut schemas = SchemaMap::new();
//! schemas.insert("Pet", TypeDescriptor::object(pet));
//!
//! // References are resolved lazily, so "Person" may be declared later.
//! assert!(!schemas.contains("Person"));
//! ```

pub mod descriptor;
pub mod document;
pub mod endpoint;
pub mod prelude;
pub mod security;

pub use descriptor::{EnumBase, EnumShape, ObjectShape, Property, SchemaMap, TypeDescriptor, TypeKind};
pub use document::{ApiDocument, ApiInfo};
pub use endpoint::{
    ApiEndpoint, ApiEndpointParameter, HttpMethod, InvalidStatusCode, JSON_MEDIA_TYPE, ParameterLocation,
    RequestBody, Response, StatusCode, is_json_media_type,
};
pub use security::SecuritySchemeDescriptor;
