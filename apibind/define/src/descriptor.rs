//! Schema fragment descriptors.
//!
//! A [`TypeDescriptor`] is the intermediate representation of one OpenAPI
//! schema fragment. The shape of the fragment lives in [`TypeKind`], a tagged
//! union, so combinations such as "an array with enum values" cannot be
//! represented.
//!
//! Top-level schemas are collected into a [`SchemaMap`], which preserves the
//! declaration order of `components.schemas` while supporting lookups by name.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

/// Describes one schema fragment.
///
/// Descriptors are built once by the parser and never mutated afterwards.
/// When a parameter or return type must be widened to optional, a derived
/// copy is produced with [`TypeDescriptor::to_nullable`].
///
/// ## Examples
///
/// ```
/// use apibind_define::{TypeDescriptor, TypeKind};
///
/// let id = TypeDescriptor::primitive("integer", Some("int64"));
/// let optional = id.to_nullable();
///
/// assert!(!id.nullable);
/// assert!(optional.nullable);
/// assert_eq!(optional.kind, id.kind);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    /// The shape of the fragment.
    #[serde(flatten)]
    pub kind: TypeKind,
    /// Whether `null` is an accepted value.
    pub nullable: bool,
    /// Free-form description copied from the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeDescriptor {
    /// Creates a non-nullable descriptor of the given kind.
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
            description: None,
        }
    }

    /// Creates a primitive descriptor such as `string` or `integer/int64`.
    pub fn primitive(type_name: impl Into<String>, format: Option<&str>) -> Self {
        Self::new(TypeKind::Primitive {
            type_name: type_name.into(),
            format: format.map(str::to_string),
        })
    }

    /// Creates a reference to a top-level schema by its bare name.
    pub fn reference(target: impl Into<String>) -> Self {
        Self::new(TypeKind::Reference {
            target: target.into(),
        })
    }

    /// Creates an array descriptor with the given item type.
    pub fn array(items: TypeDescriptor) -> Self {
        Self::new(TypeKind::Array {
            items: Box::new(items),
        })
    }

    /// Creates an object descriptor.
    pub fn object(shape: ObjectShape) -> Self {
        Self::new(TypeKind::Object(shape))
    }

    /// Creates an enum descriptor.
    pub fn enumeration(shape: EnumShape) -> Self {
        Self::new(TypeKind::Enum(shape))
    }

    /// Sets the nullable flag, consuming the builder value.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the description, consuming the builder value.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Returns a nullable copy of this descriptor.
    ///
    /// A descriptor that is already nullable is returned unchanged, so
    /// widening twice never produces a doubly-optional type.
    pub fn to_nullable(&self) -> Self {
        self.clone().with_nullable(true)
    }

    /// Returns a copy of this descriptor with the nullable flag cleared.
    pub fn to_non_nullable(&self) -> Self {
        self.clone().with_nullable(false)
    }

    /// Returns the referenced schema name when this is a reference.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Reference { target } => Some(target),
            _ => None,
        }
    }

    /// Returns `true` for the primitive `string` type without a format that
    /// maps to a richer type.
    pub fn is_plain_string(&self) -> bool {
        matches!(
            &self.kind,
            TypeKind::Primitive { type_name, format }
                if type_name == "string"
                    && !matches!(format.as_deref(), Some("date" | "date-time" | "uuid"))
        )
    }
}

/// The shape of a schema fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    /// A scalar such as `string`, `integer`, `number` or `boolean`.
    Primitive {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    /// An object with named properties.
    Object(ObjectShape),
    /// A homogeneous array.
    Array { items: Box<TypeDescriptor> },
    /// A closed set of literal values.
    Enum(EnumShape),
    /// A reference to a top-level schema, resolved lazily by name.
    Reference { target: String },
}

/// A single named property of an object schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    /// The original property key as it appears on the wire.
    pub name: String,
    /// The property's schema.
    pub schema: TypeDescriptor,
}

/// The properties and required set of an object schema.
///
/// The required set is always a subset of the declared property names:
/// [`ObjectShape::new`] discards required names that have no matching
/// property.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectShape {
    properties: Vec<Property>,
    required: BTreeSet<String>,
}

impl ObjectShape {
    /// Creates an object shape, dropping required names that are not
    /// declared as properties.
    ///
    /// ## Examples
    ///
    /// ```
    /// use apibind_define::{ObjectShape, Property, TypeDescriptor};
    ///
    /// let shape = ObjectShape::new(
    ///     vec![Property {
    ///         name: "id".to_string(),
    ///         schema: TypeDescriptor::primitive("integer", None),
    ///     }],
    ///     ["id".to_string(), "missing".to_string()],
    /// );
    ///
    /// assert!(shape.is_required("id"));
    /// assert!(!shape.is_required("missing"));
    /// ```
    pub fn new(properties: Vec<Property>, required: impl IntoIterator<Item = String>) -> Self {
        let required = required
            .into_iter()
            .filter(|name| properties.iter().any(|p| &p.name == name))
            .collect();
        Self {
            properties,
            required,
        }
    }

    /// Returns the properties in declaration order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Returns the names of the required properties.
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Returns `true` if the named property is required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Looks up a property by its original key.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// The primitive type an enum is declared over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnumBase {
    /// String literals.
    String,
    /// Integer literals.
    Integer,
}

/// The literal values of an enum schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumShape {
    /// The underlying primitive type.
    pub base: EnumBase,
    /// The `format` of the underlying primitive, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// The literal values, rendered as strings.
    pub values: Vec<String>,
}

/// The ordered set of top-level schemas of one document.
///
/// Entries keep their declaration order for stable code generation; lookups
/// by name go through an index.
///
/// ## Examples
///
/// ```
/// use apibind_define::{SchemaMap, TypeDescriptor};
///
/// let mut schemas = SchemaMap::new();
/// schemas.insert("Tags", TypeDescriptor::array(TypeDescriptor::primitive("string", None)));
///
/// assert!(schemas.contains("Tags"));
/// assert_eq!(schemas.names().collect::<Vec<_>>(), vec!["Tags"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMap {
    entries: Vec<(String, TypeDescriptor)>,
    index: BTreeMap<String, usize>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a schema, replacing any earlier schema with the same name
    /// in place.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: TypeDescriptor) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&position) => self.entries[position].1 = descriptor,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, descriptor));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.index.get(name).map(|&position| &self.entries[position].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, descriptor)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.entries.iter().map(|(name, d)| (name.as_str(), d))
    }

    /// Iterates over schema names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for SchemaMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, descriptor) in &self.entries {
            map.serialize_entry(name, descriptor)?;
        }
        map.end()
    }
}
