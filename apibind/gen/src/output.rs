//! Unit assembly, validation, formatting and atomic writes.
//!
//! [`Generator`] turns one parsed document into its generated units and
//! renders the once-per-run runtime and root units.
//!
//! ## Output Structure
//!
//! ```text
//! generated/src/
//! ├── lib.rs              # `pub mod runtime;` plus one `pub mod` per document
//! ├── runtime.rs          # ApiClientBase, ClientError<P>, encoding helpers
//! └── pet_store/
//!     ├── mod.rs          # Module docs and re-exports
//!     ├── dtos.rs
//!     ├── client.rs
//!     ├── http_client.rs
//!     └── fake_client.rs
//! ```
//!
//! Every unit is validated with `syn` before it is formatted with
//! `prettyplease`, re-indented to the configured unit and prefixed with an
//! auto-generated notice.

use std::fs;
use std::path::Path;

use apibind_define::ApiDocument;
use proc_macro2::TokenStream;
use quote::quote;
use tracing::debug;

use crate::codegen::{
    ModuleDocBuilder, OperationPlan, UnitContext, client_trait::PayloadVariants, generate_client_trait, generate_dtos,
    generate_fake_client, generate_http_client, generate_runtime, plan_operations,
};
use crate::config::GeneratorConfig;
use crate::errors::GeneratorError;
use crate::naming::{ident, is_keyword, normalize, to_snake_case};
use crate::parser::parse_document;
use crate::resolver::TypeResolver;

/// Notice prepended to every generated unit.
pub const GENERATED_NOTICE: &str = "// This code was automatically generated by apibind. Do not edit manually.\n\n";

/// Indent unit emitted by `prettyplease`.
const PRETTYPLEASE_INDENT: usize = 4;

/// One generated `(relative path, source text)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    /// Path relative to the output directory, `/`-separated.
    pub name: String,
    pub source: String,
}

/// Generates units for documents under one configuration.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    base: syn::Path,
    type_vis: syn::Visibility,
    member_vis: syn::Visibility,
}

impl Generator {
    /// Creates a generator after validating `config`.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::ConfigError`] for an invalid configuration.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        Ok(Self {
            base: config.base_path()?,
            type_vis: config.type_vis()?,
            member_vis: config.member_vis()?,
            config,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Parses one document and generates its units.
    ///
    /// The module name comes from the document title, or the file name of
    /// `document_path` when there is none. The runtime and root units are not
    /// included; see [`Generator::generate_runtime`] and
    /// [`Generator::generate_root`].
    ///
    /// ## Examples
    ///
    /// ```
    /// use apibind_gen::config::GeneratorConfig;
    /// use apibind_gen::output::Generator;
    ///
    /// let generator = Generator::new(GeneratorConfig::default()).unwrap();
    /// let units = generator
    ///     .generate("petstore.openapi.json", r#"{ "info": { "title": "Pet Store" }, "paths": {} }"#)
    ///     .unwrap();
    ///
    /// let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
    /// assert_eq!(
    ///     names,
    ///     [
    ///         "pet_store/mod.rs",
    ///         "pet_store/dtos.rs",
    ///         "pet_store/client.rs",
    ///         "pet_store/http_client.rs",
    ///         "pet_store/fake_client.rs",
    ///     ]
    /// );
    /// ```
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::InvalidJson`] or
    /// [`GeneratorError::SchemaFormat`] for unusable documents and
    /// [`GeneratorError::CodeGenError`] if generated code fails to parse.
    pub fn generate(&self, document_path: &str, text: &str) -> Result<Vec<GeneratedUnit>, GeneratorError> {
        let document = parse_document(text, document_path)?;
        let module = module_name(&document, document_path);
        self.generate_document(&document, &module)
    }

    /// Generates the units of an already parsed document into `module`.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::SchemaFormat`] when the document uses an
    /// unsupported shape and [`GeneratorError::CodeGenError`] if generated
    /// code fails to parse.
    pub fn generate_document(&self, document: &ApiDocument, module: &str) -> Result<Vec<GeneratedUnit>, GeneratorError> {
        let ctx = UnitContext {
            document,
            resolver: TypeResolver::new(&document.schemas),
            module: ident(module),
            api_name: normalize(module),
            base: self.base.clone(),
            type_vis: self.type_vis.clone(),
            member_vis: self.member_vis.clone(),
        };

        let plans = plan_operations(document, &ctx.resolver)?;
        let payloads = PayloadVariants::collect(&plans);
        debug!(
            module,
            operations = plans.len(),
            error_payloads = payloads.len(),
            "Planned operations"
        );

        let module_tokens = self.assemble_document_module(&ctx, &plans);
        let units = [
            ("mod.rs", module_tokens),
            ("dtos.rs", generate_dtos(&ctx)?),
            ("client.rs", generate_client_trait(&ctx, &plans, &payloads)?),
            ("http_client.rs", generate_http_client(&ctx, &plans, &payloads)?),
            ("fake_client.rs", generate_fake_client(&ctx, &plans)?),
        ];

        units
            .into_iter()
            .map(|(file, tokens)| self.render(format!("{module}/{file}"), &tokens))
            .collect()
    }

    /// Renders the once-per-run `runtime.rs` unit.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::CodeGenError`] if the runtime fails to parse.
    pub fn generate_runtime(&self) -> Result<GeneratedUnit, GeneratorError> {
        self.render("runtime.rs".to_string(), &generate_runtime(&self.type_vis))
    }

    /// Renders the root unit declaring `runtime` and the given document
    /// modules: `lib.rs` when the base module is `crate`, `mod.rs` otherwise.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::CodeGenError`] if the root fails to parse.
    pub fn generate_root(&self, modules: &[String]) -> Result<GeneratedUnit, GeneratorError> {
        let vis = &self.type_vis;
        let modules = modules.iter().map(|m| ident(m));
        let tokens = quote! {
            //! Generated API clients.
            //!
            //! Each document lives in its own module. `runtime` holds the HTTP
            //! plumbing shared by all clients.

            #vis mod runtime;

            #(#vis mod #modules;)*
        };
        let name = if self.config.is_crate_root() { "lib.rs" } else { "mod.rs" };
        self.render(name.to_string(), &tokens)
    }

    fn assemble_document_module(&self, ctx: &UnitContext<'_>, plans: &[OperationPlan<'_>]) -> TokenStream {
        let vis = &self.type_vis;
        let docs = ModuleDocBuilder::new(ctx, plans).build();
        let client = ctx.api_ident("", "Client");
        let payload = ctx.api_ident("", "ErrorPayload");
        let result = ctx.api_ident("", "Result");
        let http_client = ctx.api_ident("", "HttpClient");
        let fake_client = ctx.api_ident("Fake", "Client");

        quote! {
            #docs

            #vis mod client;
            #vis mod dtos;
            #vis mod fake_client;
            #vis mod http_client;

            #vis use client::{#client, #payload, #result};
            #vis use fake_client::#fake_client;
            #vis use http_client::#http_client;
        }
    }

    fn render(&self, name: String, tokens: &TokenStream) -> Result<GeneratedUnit, GeneratorError> {
        let file = validate_code(tokens)?;
        let source = reindent(&format_code(&file), &self.config.indent);
        Ok(GeneratedUnit { name, source })
    }
}

/// Derives the module name of a document.
///
/// Uses the snake-cased normalized title, falling back to the file name up to
/// its first `.`. Keywords get an `_api` suffix and an unusable name becomes
/// `api`.
///
/// ## Examples
///
/// ```
/// use apibind_define::ApiDocument;
/// use apibind_gen::output::module_name;
///
/// let doc = ApiDocument::default();
/// assert_eq!(module_name(&doc, "specs/petstore.openapi.json"), "petstore");
/// assert_eq!(module_name(&doc, "type.swagger.json"), "type_api");
/// ```
pub fn module_name(document: &ApiDocument, document_path: &str) -> String {
    let from_title = document.title().map(normalize).filter(|n| !n.is_empty());
    let normalized = from_title.unwrap_or_else(|| {
        let file_name = Path::new(document_path)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        normalize(file_name.split('.').next().unwrap_or_default())
    });

    let name = to_snake_case(&normalized);
    if name.is_empty() {
        "api".to_string()
    } else if is_keyword(&name) {
        format!("{name}_api")
    } else {
        name
    }
}

/// Validates generated code using syn.
///
/// ## Errors
///
/// Returns `GeneratorError::CodeGenError` if the code fails to parse.
pub fn validate_code(tokens: &TokenStream) -> Result<syn::File, GeneratorError> {
    syn::parse2(tokens.clone()).map_err(|e| GeneratorError::CodeGenError(format!("Generated code is invalid: {e}")))
}

/// Formats a parsed file with prettyplease and prepends the generated notice.
pub fn format_code(file: &syn::File) -> String {
    format!("{GENERATED_NOTICE}{}", prettyplease::unparse(file))
}

/// Replaces prettyplease's four-space indent unit with `indent`.
///
/// Leading spaces that do not fill a whole unit are kept as they are.
///
/// ## Examples
///
/// ```
/// use apibind_gen::output::reindent;
///
/// let source = "fn a() {\n    if b {\n        c();\n    }\n}\n";
/// assert_eq!(reindent(source, "\t"), "fn a() {\n\tif b {\n\t\tc();\n\t}\n}\n");
/// ```
pub fn reindent(source: &str, indent: &str) -> String {
    if indent == " ".repeat(PRETTYPLEASE_INDENT) {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let content = line.trim_start_matches(' ');
        let spaces = line.len() - content.len();
        out.push_str(&indent.repeat(spaces / PRETTYPLEASE_INDENT));
        out.push_str(&" ".repeat(spaces % PRETTYPLEASE_INDENT));
        out.push_str(content);
    }
    out
}

/// Writes content to a file atomically using temp file + rename.
///
/// ## Errors
///
/// Returns `GeneratorError::WriteError` if parent directories cannot be
/// created, the temp file cannot be written or the rename fails.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| GeneratorError::WriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|e| GeneratorError::WriteError {
        path: temp_path.display().to_string(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| GeneratorError::WriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apibind_define::ApiInfo;
    use tempfile::TempDir;

    const PETSTORE: &str = r##"{
        "openapi": "3.0.1",
        "info": { "title": "Pet Store", "version": "1.0.0" },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["id", "name"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string" },
                        "tag": { "type": "string" }
                    }
                }
            }
        },
        "paths": {
            "/pets/{petId}": {
                "get": {
                    "operationId": "showPetById",
                    "parameters": [
                        { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer", "format": "int64" } }
                    ],
                    "responses": {
                        "200": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } } },
                        "404": { "description": "Pet not found" }
                    }
                }
            }
        }
    }"##;

    fn generator() -> Generator {
        Generator::new(GeneratorConfig::default()).unwrap()
    }

    fn titled(title: &str) -> ApiDocument {
        ApiDocument {
            info: Some(ApiInfo {
                title: title.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn generator_debug_shows_parsed_settings() {
        let debug = format!("{:?}", generator());
        assert!(debug.contains("base_module: \"crate\""), "{debug}");
        assert!(debug.contains("type_vis"), "{debug}");
    }

    #[test]
    fn module_name_prefers_title() {
        assert_eq!(module_name(&titled("Swagger Petstore"), "x.json"), "swagger_petstore");
        assert_eq!(module_name(&titled("Self"), "x.json"), "self_api");
    }

    #[test]
    fn module_name_falls_back_to_file_stem() {
        assert_eq!(module_name(&titled("  "), "dir/shop.swagger.json"), "shop");
        assert_eq!(module_name(&ApiDocument::default(), "!!!.json"), "api");
    }

    #[test]
    fn generate_produces_document_units() {
        let units = generator().generate("petstore.openapi.json", PETSTORE).unwrap();
        assert_eq!(units.len(), 5);
        for unit in &units {
            assert!(unit.source.starts_with(GENERATED_NOTICE), "{}", unit.name);
            assert!(unit.name.starts_with("pet_store/"), "{}", unit.name);
        }

        let module = &units[0].source;
        assert!(module.contains("pub mod http_client;"), "{module}");
        assert!(module.contains("pub use client::{PetStoreClient, PetStoreErrorPayload, PetStoreResult};"), "{module}");
        assert!(module.contains("//! Generated API client for Pet Store (version 1.0.0)."), "{module}");

        let http = &units[3].source;
        assert!(http.contains("pub struct PetStoreHttpClient {"), "{http}");
        assert!(http.contains("async fn show_pet_by_id("), "{http}");
    }

    #[test]
    fn invalid_json_is_sg_api_002() {
        let err = generator().generate("broken.json", "{ not json").unwrap_err();
        assert_eq!(err.code(), "SG_API_002");
        assert!(err.to_string().contains("broken.json"), "{err}");
    }

    #[test]
    fn schema_errors_are_sg_api_001() {
        let text = r#"{ "components": { "schemas": { "Id": { "type": "string" } } } }"#;
        let err = generator().generate("ids.json", text).unwrap_err();
        assert_eq!(err.code(), "SG_API_001");
        assert!(err.to_string().contains("Type 'string' is not supported as top level type."), "{err}");
    }

    #[test]
    fn runtime_unit() {
        let unit = generator().generate_runtime().unwrap();
        assert_eq!(unit.name, "runtime.rs");
        assert!(unit.source.contains("pub struct ApiClientBase {"));
    }

    #[test]
    fn root_unit_is_lib_rs_for_crate_base() {
        let unit = generator().generate_root(&["pet_store".to_string()]).unwrap();
        assert_eq!(unit.name, "lib.rs");
        assert!(unit.source.contains("pub mod runtime;"), "{}", unit.source);
        assert!(unit.source.contains("pub mod pet_store;"), "{}", unit.source);
    }

    #[test]
    fn root_unit_is_mod_rs_for_nested_base() {
        let generator = Generator::new(GeneratorConfig {
            base_module: "crate::apis".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(generator.generate_root(&[]).unwrap().name, "mod.rs");

        let units = generator.generate("petstore.json", PETSTORE).unwrap();
        let client = &units[2].source;
        assert!(client.contains("use crate::apis::runtime::ClientError;"), "{client}");
    }

    #[test]
    fn configured_indent_is_applied() {
        let generator = Generator::new(GeneratorConfig {
            indent: "\t".to_string(),
            ..Default::default()
        })
        .unwrap();
        let unit = generator.generate_runtime().unwrap();
        assert!(unit.source.contains("\n\thttp: reqwest::Client,\n"), "{}", unit.source);
        assert!(!unit.source.contains("\n    http: reqwest::Client,"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Generator::new(GeneratorConfig {
            type_visibility: "open".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), "SG_API_005");
    }

    #[test]
    fn reindent_keeps_partial_units() {
        assert_eq!(reindent("      x\n", "  "), "    x\n");
        assert_eq!(reindent("x\n\n  y", "\t"), "x\n\n  y");
    }

    #[test]
    fn validate_code_reports_code_gen_error() {
        let err = validate_code(&quote! { fn broken }).unwrap_err();
        assert_eq!(err.code(), "SG_API_004");
        assert!(err.to_string().contains("Generated code is invalid"));
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("b").join("mod.rs");
        write_atomic(&path, "// x\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "// x\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn write_atomic_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lib.rs");
        write_atomic(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
