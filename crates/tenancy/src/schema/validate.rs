//! Document validation against a [`SchemaDefinition`].

use chrono::DateTime;
use serde_json::Value;

use crate::error::ValidationDetail;

use super::{FieldType, SchemaDefinition};

const TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

/// Collects every violation in `document`; an empty result means valid.
pub(super) fn check_document(schema: &SchemaDefinition, document: &Value) -> Vec<ValidationDetail> {
    let mut details = Vec::new();

    let Some(object) = document.as_object() else {
        details.push(ValidationDetail::new("$", "document must be an object"));
        return details;
    };

    for field in &schema.fields {
        match object.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    details.push(ValidationDetail::new(&field.name, "is required"));
                }
            }
            Some(value) => check_value(&field.name, &field.field_type, value, &mut details),
        }
    }

    if schema.strict {
        for key in object.keys() {
            let declared = schema.field(key).is_some()
                || key == "_id"
                || (schema.timestamps && TIMESTAMP_FIELDS.contains(&key.as_str()));
            if !declared {
                details.push(ValidationDetail::new(key, "is not declared in the schema"));
            }
        }
    }

    details
}

fn check_value(path: &str, field_type: &FieldType, value: &Value, details: &mut Vec<ValidationDetail>) {
    match field_type {
        FieldType::String { min_len, max_len } => {
            let Some(s) = value.as_str() else {
                details.push(ValidationDetail::new(path, "expected string"));
                return;
            };
            let len = s.chars().count();
            if min_len.is_some_and(|min| len < min) {
                details.push(ValidationDetail::new(
                    path,
                    format!("must be at least {} characters", min_len.unwrap_or_default()),
                ));
            }
            if max_len.is_some_and(|max| len > max) {
                details.push(ValidationDetail::new(
                    path,
                    format!("must be at most {} characters", max_len.unwrap_or_default()),
                ));
            }
        }
        FieldType::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                details.push(ValidationDetail::new(path, "expected number"));
                return;
            };
            if let Some(min) = min.filter(|min| n < *min) {
                details.push(ValidationDetail::new(path, format!("must be >= {}", min)));
            }
            if let Some(max) = max.filter(|max| n > *max) {
                details.push(ValidationDetail::new(path, format!("must be <= {}", max)));
            }
        }
        FieldType::Integer => {
            if !(value.is_i64() || value.is_u64()) {
                details.push(ValidationDetail::new(path, "expected integer"));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                details.push(ValidationDetail::new(path, "expected boolean"));
            }
        }
        FieldType::Date => {
            if !value.as_str().is_some_and(is_rfc3339) {
                details.push(ValidationDetail::new(path, "expected RFC 3339 timestamp"));
            }
        }
        FieldType::ObjectId | FieldType::Reference { .. } => {
            if !value.as_str().is_some_and(is_object_id) {
                details.push(ValidationDetail::new(path, "expected 24-character hex id"));
            }
        }
        FieldType::Enum { values } => match value.as_str() {
            Some(s) if values.iter().any(|v| v == s) => {}
            _ => details.push(ValidationDetail::new(
                path,
                format!("must be one of: {}", values.join(", ")),
            )),
        },
        FieldType::Array { items } => {
            let Some(elements) = value.as_array() else {
                details.push(ValidationDetail::new(path, "expected array"));
                return;
            };
            for (i, element) in elements.iter().enumerate() {
                check_value(&format!("{}.{}", path, i), items, element, details);
            }
        }
        FieldType::Object => {
            if !value.is_object() {
                details.push(ValidationDetail::new(path, "expected object"));
            }
        }
        FieldType::Mixed => {}
    }
}

fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_rfc3339(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}
