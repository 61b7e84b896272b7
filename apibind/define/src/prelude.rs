//! Convenient re-exports for working with the apibind intermediate
//! representation.
//!
//! ## Examples
//!
//! ```
//! use apibind_define::prelude::*;
//!
//! let mut schemas = SchemaMap::new();
//! schemas.insert(
//!     "Status",
//!     TypeDescriptor::enumeration(EnumShape {
//!         base: EnumBase::String,
//!         format: None,
//!         values: vec!["Open".to_string(), "Closed".to_string()],
//!     }),
//! );
//! assert_eq!(schemas.len(), 1);
//! ```

pub use crate::descriptor::{EnumBase, EnumShape, ObjectShape, Property, SchemaMap, TypeDescriptor, TypeKind};
pub use crate::document::{ApiDocument, ApiInfo};
pub use crate::endpoint::{
    ApiEndpoint, ApiEndpointParameter, HttpMethod, ParameterLocation, RequestBody, Response, StatusCode,
};
pub use crate::security::SecuritySchemeDescriptor;
