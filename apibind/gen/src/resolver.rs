//! Type resolution.
//!
//! [`TypeResolver`] maps a [`TypeDescriptor`] to the Rust type used in
//! generated code. It is the only place that knows the `(type, format)` →
//! Rust mapping; the DTO and client generators both go through it.
//!
//! | type | format | Rust type | reference-like |
//! |------|--------|-----------|----------------|
//! | `string` | *other* | `String` | yes |
//! | `string` | `date-time` | `chrono::DateTime<chrono::Utc>` | no |
//! | `string` | `date` | `chrono::NaiveDate` | no |
//! | `string` | `uuid` | `uuid::Uuid` | no |
//! | `number` | `float` | `f32` | no |
//! | `number` | `double`, `decimal`, *none* | `f64` | no |
//! | `number` | `int32` / `int64` | `i32` / `i64` | no |
//! | `integer` | `int64` | `i64` | no |
//! | `integer` | `int32`, *none* | `i32` | no |
//! | `boolean` | *any* | `bool` | no |
//! | `object` | | `serde_json::Value` | yes |
//! | `array` | | `Vec<Item>` | yes |
//! | `$ref` | | generated name of the target | yes |
//!
//! Nullable descriptors are wrapped in `Option<…>`.
//!
//! The reference-like column is a policy, not a property of the wire format:
//! it decides which optional fields become `Option<T>` instead of defaulting.

use std::collections::{BTreeMap, BTreeSet};

use apibind_define::{Property, SchemaMap, TypeDescriptor, TypeKind};

use crate::errors::{GeneratorError, SchemaFormatError};
use crate::naming::TypeNames;

/// The Rust type computed for a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Rust type as source text, e.g. `Option<Vec<Pet>>`.
    pub name: String,
    /// Whether the "no value" state of the type is `None` rather than a
    /// numeric or boolean default.
    pub reference_like: bool,
}

impl ResolvedType {
    /// Parses the type name into a `syn::Type` for splicing into `quote!`.
    ///
    /// ## Errors
    ///
    /// Returns [`GeneratorError::CodeGenError`] if the name is not a valid
    /// Rust type.
    pub fn to_type(&self) -> Result<syn::Type, GeneratorError> {
        syn::parse_str(&self.name)
            .map_err(|e| GeneratorError::CodeGenError(format!("'{}' is not a valid type: {e}", self.name)))
    }
}

/// Maps a primitive `(type, format)` pair to a Rust type and whether it is
/// reference-like.
///
/// ## Errors
///
/// Returns a [`SchemaFormatError`] for pairs outside the mapping table.
pub fn map_primitive(type_name: &str, format: Option<&str>) -> Result<(&'static str, bool), SchemaFormatError> {
    let mapped = match (type_name, format) {
        ("string", Some("date-time")) => ("chrono::DateTime<chrono::Utc>", false),
        ("string", Some("date")) => ("chrono::NaiveDate", false),
        ("string", Some("uuid")) => ("uuid::Uuid", false),
        ("string", _) => ("String", true),
        ("number", Some("float")) => ("f32", false),
        ("number", Some("int32")) => ("i32", false),
        ("number", Some("int64")) => ("i64", false),
        ("number", None | Some("double" | "decimal")) => ("f64", false),
        ("integer", Some("int64")) => ("i64", false),
        ("integer", None | Some("int32")) => ("i32", false),
        ("boolean", _) => ("bool", false),
        ("object", _) => ("serde_json::Value", true),
        _ => {
            return Err(SchemaFormatError::new(format!(
                "Unsupported type '{type_name}' with format '{}'.",
                format.unwrap_or("none")
            )));
        }
    };
    Ok(mapped)
}

/// Resolves descriptors against one document's schema map.
///
/// Schema names are allocated for the whole map up front, so references are
/// looked up by name and forward or cyclic references need no special
/// ordering.
///
/// ## Examples
///
/// ```
/// use apibind_define::{ObjectShape, SchemaMap, TypeDescriptor};
/// use apibind_gen::resolver::TypeResolver;
///
/// let mut schemas = SchemaMap::new();
/// schemas.insert("pet", TypeDescriptor::object(ObjectShape::default()));
/// let resolver = TypeResolver::new(&schemas);
///
/// let pets = TypeDescriptor::array(TypeDescriptor::reference("pet")).with_nullable(true);
/// let resolved = resolver.resolve(&pets).unwrap();
/// assert_eq!(resolved.name, "Option<Vec<Pet>>");
/// assert!(resolved.reference_like);
///
/// assert!(resolver.resolve(&TypeDescriptor::reference("Missing")).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TypeResolver<'a> {
    schemas: &'a SchemaMap,
    names: TypeNames,
    recursive: BTreeSet<(String, String)>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(schemas: &'a SchemaMap) -> Self {
        Self {
            schemas,
            names: TypeNames::from_schemas(schemas),
            recursive: find_recursive_properties(schemas),
        }
    }

    pub fn schemas(&self) -> &'a SchemaMap {
        self.schemas
    }

    /// Returns the generated type name of a schema key.
    ///
    /// ## Errors
    ///
    /// Returns a [`SchemaFormatError`] if the key is not in the schema map.
    pub fn type_name(&self, key: &str) -> Result<&str, SchemaFormatError> {
        self.names.get(key).ok_or_else(|| {
            SchemaFormatError::new(format!(
                "Reference target '{key}' is not defined in components.schemas."
            ))
        })
    }

    /// Resolves a descriptor to its Rust type.
    ///
    /// ## Errors
    ///
    /// Returns a [`SchemaFormatError`] for unsupported `(type, format)` pairs
    /// and dangling references.
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<ResolvedType, SchemaFormatError> {
        self.resolve_inner(descriptor, false)
    }

    /// Resolves an object property, boxing references that lead back to
    /// `owner`. Errors carry the property name as context.
    ///
    /// ## Errors
    ///
    /// Same as [`TypeResolver::resolve`].
    pub fn resolve_property(&self, owner: &str, property: &Property) -> Result<ResolvedType, SchemaFormatError> {
        let boxed = self
            .recursive
            .contains(&(owner.to_string(), property.name.clone()));
        self.resolve_inner(&property.schema, boxed)
            .map_err(|e| e.with_context(&property.name))
    }

    /// Returns `true` if the property needs `Box` indirection.
    pub fn is_recursive(&self, owner: &str, property: &str) -> bool {
        self.recursive
            .contains(&(owner.to_string(), property.to_string()))
    }

    /// Follows a reference to its target descriptor.
    pub fn target(&self, descriptor: &TypeDescriptor) -> Option<&'a TypeDescriptor> {
        descriptor
            .reference_target()
            .and_then(|target| self.schemas.get(target))
    }

    /// Returns `true` for inline enums and references to enum schemas.
    pub fn is_enum(&self, descriptor: &TypeDescriptor) -> bool {
        match &descriptor.kind {
            TypeKind::Enum(_) => true,
            TypeKind::Reference { .. } => self
                .target(descriptor)
                .is_some_and(|target| matches!(target.kind, TypeKind::Enum(_))),
            _ => false,
        }
    }

    fn resolve_inner(&self, descriptor: &TypeDescriptor, boxed: bool) -> Result<ResolvedType, SchemaFormatError> {
        let (name, reference_like) = match &descriptor.kind {
            TypeKind::Primitive { type_name, format } => {
                let (name, reference_like) = map_primitive(type_name, format.as_deref())?;
                (name.to_string(), reference_like)
            }
            TypeKind::Enum(shape) => {
                let (name, reference_like) = map_primitive(&shape.base.to_string(), shape.format.as_deref())?;
                (name.to_string(), reference_like)
            }
            TypeKind::Object(_) => ("serde_json::Value".to_string(), true),
            TypeKind::Array { items } => {
                let item = self.resolve_inner(items, false)?;
                (format!("Vec<{}>", item.name), true)
            }
            TypeKind::Reference { target } => {
                let name = self.type_name(target)?;
                let name = if boxed {
                    format!("Box<{name}>")
                } else {
                    name.to_string()
                };
                (name, true)
            }
        };

        let name = if descriptor.nullable {
            format!("Option<{name}>")
        } else {
            name
        };
        Ok(ResolvedType {
            name,
            reference_like,
        })
    }
}

/// Finds `(owner, property)` pairs whose direct reference leads back to the
/// owner. Arrays already add indirection, so only direct references count.
fn find_recursive_properties(schemas: &SchemaMap) -> BTreeSet<(String, String)> {
    let mut edges: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (owner, descriptor) in schemas.iter() {
        if let TypeKind::Object(shape) = &descriptor.kind {
            for property in shape.properties() {
                if let Some(target) = property.schema.reference_target() {
                    edges
                        .entry(owner)
                        .or_default()
                        .push((property.name.as_str(), target));
                }
            }
        }
    }

    let mut recursive = BTreeSet::new();
    for (owner, properties) in &edges {
        for (property, target) in properties {
            if reaches(&edges, target, owner) {
                recursive.insert((owner.to_string(), property.to_string()));
            }
        }
    }
    recursive
}

fn reaches(edges: &BTreeMap<&str, Vec<(&str, &str)>>, from: &str, to: &str) -> bool {
    let mut stack = vec![from];
    let mut seen = BTreeSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(next) = edges.get(current) {
            stack.extend(next.iter().map(|(_, target)| *target));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use apibind_define::{EnumBase, EnumShape, ObjectShape};

    fn object(properties: Vec<(&str, TypeDescriptor)>) -> TypeDescriptor {
        TypeDescriptor::object(ObjectShape::new(
            properties
                .into_iter()
                .map(|(name, schema)| Property {
                    name: name.to_string(),
                    schema,
                })
                .collect(),
            Vec::new(),
        ))
    }

    fn resolve_primitive(type_name: &str, format: Option<&str>) -> ResolvedType {
        let schemas = SchemaMap::new();
        TypeResolver::new(&schemas)
            .resolve(&TypeDescriptor::primitive(type_name, format))
            .unwrap()
    }

    #[test]
    fn mapping_table() {
        let cases = [
            ("string", None, "String", true),
            ("string", Some("email"), "String", true),
            ("string", Some("binary"), "String", true),
            ("string", Some("date-time"), "chrono::DateTime<chrono::Utc>", false),
            ("string", Some("date"), "chrono::NaiveDate", false),
            ("string", Some("uuid"), "uuid::Uuid", false),
            ("number", None, "f64", false),
            ("number", Some("float"), "f32", false),
            ("number", Some("double"), "f64", false),
            ("number", Some("decimal"), "f64", false),
            ("number", Some("int32"), "i32", false),
            ("number", Some("int64"), "i64", false),
            ("integer", None, "i32", false),
            ("integer", Some("int32"), "i32", false),
            ("integer", Some("int64"), "i64", false),
            ("boolean", None, "bool", false),
            ("object", None, "serde_json::Value", true),
        ];
        for (type_name, format, expected, reference_like) in cases {
            let resolved = resolve_primitive(type_name, format);
            assert_eq!(resolved.name, expected, "{type_name}/{format:?}");
            assert_eq!(resolved.reference_like, reference_like, "{type_name}/{format:?}");
        }
    }

    #[test]
    fn unsupported_pairs_are_errors() {
        let schemas = SchemaMap::new();
        let resolver = TypeResolver::new(&schemas);
        for (type_name, format) in [("integer", Some("uint8")), ("file", None), ("number", Some("money"))] {
            let err = resolver
                .resolve(&TypeDescriptor::primitive(type_name, format))
                .unwrap_err();
            assert!(err.message().starts_with("Unsupported type"), "{err}");
        }
    }

    #[test]
    fn nullable_wraps_in_option() {
        let schemas = SchemaMap::new();
        let resolver = TypeResolver::new(&schemas);
        let resolved = resolver
            .resolve(&TypeDescriptor::primitive("integer", Some("int64")).to_nullable())
            .unwrap();
        assert_eq!(resolved.name, "Option<i64>");
        assert!(!resolved.reference_like);
    }

    #[test]
    fn inline_object_and_enum() {
        let schemas = SchemaMap::new();
        let resolver = TypeResolver::new(&schemas);
        assert_eq!(resolver.resolve(&object(vec![])).unwrap().name, "serde_json::Value");

        let inline = TypeDescriptor::enumeration(EnumShape {
            base: EnumBase::Integer,
            format: Some("int64".to_string()),
            values: vec!["1".to_string()],
        });
        assert_eq!(resolver.resolve(&inline).unwrap().name, "i64");
        assert!(resolver.is_enum(&inline));
    }

    #[test]
    fn reference_resolves_to_generated_name() {
        let mut schemas = SchemaMap::new();
        schemas.insert("pet_owner", object(vec![]));
        let resolver = TypeResolver::new(&schemas);

        let resolved = resolver.resolve(&TypeDescriptor::reference("pet_owner")).unwrap();
        assert_eq!(resolved.name, "PetOwner");
        assert!(resolved.reference_like);
        assert!(!resolver.is_enum(&TypeDescriptor::reference("pet_owner")));
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let schemas = SchemaMap::new();
        let err = TypeResolver::new(&schemas)
            .resolve(&TypeDescriptor::array(TypeDescriptor::reference("Ghost")))
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Reference target 'Ghost' is not defined in components.schemas."
        );
    }

    #[test]
    fn self_reference_is_boxed() {
        let mut schemas = SchemaMap::new();
        schemas.insert(
            "Node",
            object(vec![
                ("next", TypeDescriptor::reference("Node").with_nullable(true)),
                ("children", TypeDescriptor::array(TypeDescriptor::reference("Node"))),
            ]),
        );
        let resolver = TypeResolver::new(&schemas);
        let TypeKind::Object(shape) = &schemas.get("Node").unwrap().kind else {
            panic!("expected object");
        };
        let next = resolver.resolve_property("Node", &shape.properties()[0]).unwrap();
        let children = resolver.resolve_property("Node", &shape.properties()[1]).unwrap();
        assert_eq!(next.name, "Option<Box<Node>>");
        assert_eq!(children.name, "Vec<Node>");
    }

    #[test]
    fn mutual_recursion_is_boxed_on_both_sides() {
        let mut schemas = SchemaMap::new();
        schemas.insert("A", object(vec![("b", TypeDescriptor::reference("B"))]));
        schemas.insert("B", object(vec![("a", TypeDescriptor::reference("A").with_nullable(true))]));
        schemas.insert("C", object(vec![("a", TypeDescriptor::reference("A"))]));
        let resolver = TypeResolver::new(&schemas);

        assert!(resolver.is_recursive("A", "b"));
        assert!(resolver.is_recursive("B", "a"));
        assert!(!resolver.is_recursive("C", "a"));
    }

    #[test]
    fn property_errors_carry_property_name() {
        let schemas = SchemaMap::new();
        let resolver = TypeResolver::new(&schemas);
        let property = Property {
            name: "owner".to_string(),
            schema: TypeDescriptor::reference("Person"),
        };
        let err = resolver.resolve_property("Pet", &property).unwrap_err();
        assert_eq!(err.context(), ["owner".to_string()]);
    }

    #[test]
    fn resolved_types_parse_as_syn_types() {
        let resolved = ResolvedType {
            name: "Option<Vec<chrono::DateTime<chrono::Utc>>>".to_string(),
            reference_like: true,
        };
        assert!(resolved.to_type().is_ok());
    }
}
