//! Entity schema definitions.
//!
//! A [`SchemaDefinition`] is a pure description of one entity's shape and
//! validation rules. Schemas never embed other schemas: a field that points at
//! another tenant-scoped entity uses [`FieldType::Reference`] with the target's
//! name, resolved lazily at query time. This keeps every entity definition an
//! independent leaf.
//!
//! Structural equality (`PartialEq`) is what the model registry uses to tell an
//! idempotent re-registration from a conflicting one.
//!
//! # Example
//!
//! ```
//! use empresa_tenancy::schema::{FieldDefinition, FieldType, SchemaDefinition};
//! use serde_json::json;
//!
//! let schema = SchemaDefinition::new()
//!     .with_field(FieldDefinition::new("nombre", FieldType::string()).required())
//!     .with_field(FieldDefinition::new("empresaId", FieldType::reference("Empresa")));
//!
//! assert!(schema.validate("Cliente", &json!({"nombre": "Ana"})).is_ok());
//! assert!(schema.validate("Cliente", &json!({})).is_err());
//! assert_eq!(schema.references().collect::<Vec<_>>(), vec!["Empresa"]);
//! ```

mod validate;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// The type of a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldType {
    /// UTF-8 string with optional length bounds.
    #[serde(rename_all = "camelCase")]
    String {
        /// Minimum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_len: Option<usize>,
        /// Maximum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },
    /// Floating point number with optional bounds.
    Number {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Whole number.
    Integer,
    /// Boolean flag.
    Boolean,
    /// RFC 3339 timestamp string.
    Date,
    /// 24-character hex document id.
    ObjectId,
    /// One of a fixed set of strings.
    Enum {
        /// Allowed values.
        values: Vec<String>,
    },
    /// Homogeneous array.
    Array {
        /// Element type.
        items: Box<FieldType>,
    },
    /// Any JSON object.
    Object,
    /// Any JSON value.
    Mixed,
    /// Id of another entity, referenced by name.
    Reference {
        /// Referenced entity name.
        entity: String,
    },
}

impl FieldType {
    /// Unbounded string.
    pub fn string() -> Self {
        FieldType::String {
            min_len: None,
            max_len: None,
        }
    }

    /// String with a maximum length.
    pub fn string_max(max_len: usize) -> Self {
        FieldType::String {
            min_len: None,
            max_len: Some(max_len),
        }
    }

    /// Unbounded number.
    pub fn number() -> Self {
        FieldType::Number {
            min: None,
            max: None,
        }
    }

    /// Non-negative number.
    pub fn non_negative() -> Self {
        FieldType::Number {
            min: Some(0.0),
            max: None,
        }
    }

    /// Enumeration over the given values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Array of `items`.
    pub fn array(items: FieldType) -> Self {
        FieldType::Array {
            items: Box::new(items),
        }
    }

    /// Reference to the named entity.
    pub fn reference(entity: impl Into<String>) -> Self {
        FieldType::Reference {
            entity: entity.into(),
        }
    }

    fn referenced_entity(&self) -> Option<&str> {
        match self {
            FieldType::Reference { entity } => Some(entity),
            FieldType::Array { items } => items.referenced_entity(),
            _ => None,
        }
    }
}

/// A single field of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Field name as stored in the document.
    pub name: String,
    /// Field type.
    pub field_type: FieldType,
    /// Whether the field must be present and non-null.
    #[serde(default)]
    pub required: bool,
    /// Whether a unique index is declared on the field.
    #[serde(default)]
    pub unique: bool,
    /// Whether a (non-unique) index is declared on the field.
    #[serde(default)]
    pub index: bool,
    /// Default value applied by writers when the field is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDefinition {
    /// Creates an optional field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            index: false,
            default: None,
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares a unique index on the field.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declares an index on the field.
    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A compound index over several fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// `(field, ascending)` pairs in key order.
    pub keys: Vec<(String, bool)>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// Whether documents missing the indexed fields are left out.
    #[serde(default)]
    pub sparse: bool,
}

impl IndexDefinition {
    /// Ascending index over `fields`.
    pub fn ascending<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: fields.into_iter().map(|f| (f.into(), true)).collect(),
            unique: false,
            sparse: false,
        }
    }

    /// Makes the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Skips documents that lack the indexed fields.
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }
}

/// Shape and validation rules for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Declared fields in order.
    pub fields: Vec<FieldDefinition>,
    /// Compound indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    /// Whether `createdAt`/`updatedAt` are maintained by writers.
    #[serde(default)]
    pub timestamps: bool,
    /// Whether undeclared fields are rejected.
    #[serde(default)]
    pub strict: bool,
}

impl SchemaDefinition {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a compound index.
    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Enables `createdAt`/`updatedAt` timestamps.
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Rejects undeclared fields.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of entities referenced by this schema, in field order.
    pub fn references(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .iter()
            .filter_map(|f| f.field_type.referenced_entity())
    }

    /// All indexes to create: single-field declarations followed by compound ones.
    ///
    /// A unique index on an optional field is sparse, so any number of
    /// documents may omit the field.
    pub fn index_plan(&self) -> Vec<IndexDefinition> {
        let single = self
            .fields
            .iter()
            .filter(|f| f.unique || f.index)
            .map(|f| IndexDefinition {
                keys: vec![(f.name.clone(), true)],
                unique: f.unique,
                sparse: f.unique && !f.required,
            });
        single.chain(self.indexes.iter().cloned()).collect()
    }

    /// Validates a JSON document against this schema.
    pub fn validate(&self, entity: &str, document: &Value) -> Result<(), ValidationError> {
        let details = validate::check_document(self, document);
        if details.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::InvalidDocument {
                entity: entity.to_string(),
                details,
            })
        }
    }
}

/// A business entity stored in tenant databases.
///
/// Implementors are the schema factories: each one pairs a Rust type with
/// its [`SchemaDefinition`] and registers it by [`NAME`](Entity::NAME).
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Entity (collection) name.
    const NAME: &'static str;

    /// Returns the entity's schema.
    fn schema() -> SchemaDefinition;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SchemaDefinition {
        SchemaDefinition::new()
            .with_field(FieldDefinition::new("codigo", FieldType::string()).required().unique())
            .with_field(FieldDefinition::new("clienteId", FieldType::reference("Cliente")).indexed())
            .with_field(FieldDefinition::new(
                "etiquetas",
                FieldType::array(FieldType::reference("Etiqueta")),
            ))
            .with_index(IndexDefinition::ascending(["codigo", "clienteId"]).unique())
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(sample(), sample());
        assert_ne!(sample(), sample().with_timestamps());
    }

    #[test]
    fn test_references_by_name() {
        let schema = sample();
        let refs: Vec<_> = schema.references().collect();
        assert_eq!(refs, vec!["Cliente", "Etiqueta"]);
    }

    #[test]
    fn test_index_plan() {
        let plan = sample().index_plan();
        assert_eq!(plan.len(), 3);
        assert!(plan[0].unique);
        assert!(!plan[1].unique);
        assert_eq!(plan[2].keys.len(), 2);
    }

    #[test]
    fn test_optional_unique_fields_get_sparse_indexes() {
        let schema = SchemaDefinition::new()
            .with_field(FieldDefinition::new("codigo", FieldType::string()).required().unique())
            .with_field(FieldDefinition::new("nif", FieldType::string()).unique())
            .with_field(FieldDefinition::new("email", FieldType::string()).indexed());
        let plan = schema.index_plan();

        assert!(!plan[0].sparse);
        assert!(plan[1].unique && plan[1].sparse);
        assert!(!plan[2].sparse);
    }

    #[test]
    fn test_field_lookup() {
        let schema = sample();
        assert!(schema.field("codigo").is_some_and(|f| f.required));
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_schema_serde() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["fields"][1]["fieldType"], json!({"type": "reference", "entity": "Cliente"}));

        let back: SchemaDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }
}
