//! JSON schema of the index file.

use serde_json::{Value, json};

/// Draft-07 schema describing the index file.
pub fn index_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "FileIndexResult",
        "type": "object",
        "required": ["files", "summary"],
        "properties": {
            "files": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": FILE_FIELDS.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
                    "properties": properties(FILE_FIELDS),
                },
            },
            "summary": {
                "type": "object",
                "required": SUMMARY_FIELDS.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
                "properties": properties(SUMMARY_FIELDS),
            },
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    String,
    DateTime,
    Integer,
    Boolean,
    StringArray,
}

const FILE_FIELDS: &[(&str, FieldType)] = &[
    ("name", FieldType::String),
    ("path", FieldType::String),
    ("size", FieldType::Integer),
    ("modified_time", FieldType::DateTime),
    ("created_time", FieldType::DateTime),
    ("is_hidden", FieldType::Boolean),
    ("is_readonly", FieldType::Boolean),
    ("is_system", FieldType::Boolean),
    ("is_archive", FieldType::Boolean),
];

const SUMMARY_FIELDS: &[(&str, FieldType)] = &[
    ("total_files", FieldType::Integer),
    ("total_size", FieldType::Integer),
    ("indexed_paths", FieldType::StringArray),
    ("timestamp", FieldType::DateTime),
];

fn properties(fields: &[(&str, FieldType)]) -> Value {
    let map = fields
        .iter()
        .map(|(name, ty)| {
            let schema = match ty {
                FieldType::String => json!({"type": "string"}),
                FieldType::DateTime => json!({"type": "string", "format": "date-time"}),
                FieldType::Integer => json!({"type": "integer"}),
                FieldType::Boolean => json!({"type": "boolean"}),
                FieldType::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            };
            (name.to_string(), schema)
        })
        .collect();
    Value::Object(map)
}

fn matches_type(value: &Value, ty: FieldType) -> bool {
    match ty {
        FieldType::String | FieldType::DateTime => value.is_string(),
        FieldType::Integer => value.is_u64() || value.is_i64(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::StringArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    }
}

fn check_object(value: &Value, fields: &[(&str, FieldType)], at: &str) -> Result<(), String> {
    let object = value.as_object().ok_or_else(|| format!("{at}: expected an object"))?;
    for (name, ty) in fields {
        let field = object
            .get(*name)
            .ok_or_else(|| format!("{at}: missing required key '{name}'"))?;
        if !matches_type(field, *ty) {
            return Err(format!("{at}.{name}: unexpected type"));
        }
    }
    Ok(())
}

/// Check a parsed index document against the mandatory keys and types of
/// [`index_schema`].
///
/// Returns the first violation found. Date-time formats are not parsed.
pub fn validate_index_value(value: &Value) -> Result<(), String> {
    let object = value.as_object().ok_or("document: expected an object")?;

    let files = object
        .get("files")
        .ok_or("document: missing required key 'files'")?
        .as_array()
        .ok_or("files: expected an array")?;
    for (i, file) in files.iter().enumerate() {
        check_object(file, FILE_FIELDS, &format!("files[{i}]"))?;
    }

    let summary = object
        .get("summary")
        .ok_or("document: missing required key 'summary'")?;
    check_object(summary, SUMMARY_FIELDS, "summary")
}
