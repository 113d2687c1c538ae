//! Builders for the response-schema subset understood by the model API.

use serde_json::{json, Map, Value};

pub fn string() -> Value {
    json!({"type": "STRING"})
}

pub fn integer() -> Value {
    json!({"type": "INTEGER"})
}

pub fn number() -> Value {
    json!({"type": "NUMBER"})
}

pub fn boolean() -> Value {
    json!({"type": "BOOLEAN"})
}

pub fn array(items: Value) -> Value {
    json!({"type": "ARRAY", "items": items})
}

pub fn enumeration(values: &[&str]) -> Value {
    json!({"type": "STRING", "enum": values})
}

/// Object schema; every listed property is required.
pub fn object(properties: &[(&str, Value)]) -> Value {
    let mut props = Map::new();
    for (name, schema) in properties {
        props.insert((*name).to_string(), schema.clone());
    }
    let required: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    json!({"type": "OBJECT", "properties": props, "required": required})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_marks_all_required() {
        let schema = object(&[("title", string()), ("tags", array(string()))]);
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "STRING");
        assert_eq!(schema["required"], json!(["title", "tags"]));
    }
}
