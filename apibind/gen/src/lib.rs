//! apibind code generator library.
//!
//! This crate compiles OpenAPI documents (JSON) into strongly-typed Rust
//! clients. For every document it generates:
//!
//! - Data transfer types for `components.schemas`
//! - A client trait with one async method per operation, an error payload
//!   enum and a result alias
//! - A live `reqwest`-backed client that dispatches on the response status
//! - A fake client returning empty values, for tests
//!
//! A run also emits one shared `runtime.rs` with the HTTP plumbing and a root
//! unit declaring all modules.
//!
//! ## Modules
//!
//! - [`naming`] - Identifier normalization and name allocation
//! - [`parser`] - OpenAPI JSON to [`apibind_define::ApiDocument`]
//! - [`resolver`] - Descriptor to Rust type resolution
//! - [`dispatch`] - Response status dispatch plans
//! - [`query`] - Query string construction plans
//! - [`path_template`] - Path placeholder extraction and formatting
//! - [`codegen`] - Token generation for each unit
//! - [`output`] - Unit assembly, validation, formatting and atomic writes
//! - [`driver`] - Document discovery and whole-run generation
//! - [`manifest`] - `Cargo.toml` for the output crate
//! - [`config`] - Generator configuration
//! - [`errors`] - Error types and diagnostics
//!
//! ## Example Usage
//!
//! ```
//! use apibind_gen::config::GeneratorConfig;
//! use apibind_gen::output::Generator;
//!
//! let document = r##"{
//!     "openapi": "3.0.1",
//!     "info": { "title": "Pet Store" },
//!     "paths": {
//!         "/pets": {
//!             "get": {
//!                 "operationId": "listPets",
//!                 "responses": {
//!                     "200": { "content": { "application/json": { "schema": {
//!                         "type": "array", "items": { "type": "string" }
//!                     } } } }
//!                 }
//!             }
//!         }
//!     }
//! }"##;
//!
//! let generator = Generator::new(GeneratorConfig::default()).unwrap();
//! let units = generator.generate("petstore.openapi.json", document).unwrap();
//!
//! let client = units.iter().find(|u| u.name == "pet_store/client.rs").unwrap();
//! assert!(client.source.contains("pub trait PetStoreClient"));
//! ```

pub mod codegen;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod errors;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod parser;
pub mod path_template;
pub mod query;
pub mod resolver;

#[cfg(test)]
mod test_utils;
