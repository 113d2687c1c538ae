//! Builders for the OpenAPI fragments each module contributes.

use serde_json::{json, Value};

pub fn reference(schema: &str) -> Value {
    json!({"$ref": format!("#/components/schemas/{schema}")})
}

pub fn array_of(schema: &str) -> Value {
    json!({"type": "array", "items": reference(schema)})
}

pub fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {"application/json": {"schema": reference(schema)}}
    })
}

pub fn multipart_body(field: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "multipart/form-data": {
                "schema": {
                    "type": "object",
                    "properties": {field: {"type": "string", "format": "binary"}},
                    "required": [field]
                }
            }
        }
    })
}

pub fn path_id() -> Value {
    json!({"name": "id", "in": "path", "required": true, "schema": {"type": "string"}})
}

pub fn query_param(name: &str, kind: &str) -> Value {
    json!({"name": name, "in": "query", "required": false, "schema": {"type": kind}})
}

/// An operation answering `status` with `schema`, plus the shared error response.
pub fn operation(tag: &str, summary: &str, status: &str, schema: Value) -> Value {
    json!({
        "summary": summary,
        "tags": [tag],
        "responses": {
            status: {
                "description": summary,
                "content": {"application/json": {"schema": schema}}
            },
            "default": {
                "description": "Error",
                "content": {"application/json": {"schema": reference("ErrorResponse")}}
            }
        }
    })
}

/// Attach a request body to an operation built by [`operation`].
pub fn with_body(mut operation: Value, body: Value) -> Value {
    operation["requestBody"] = body;
    operation
}

pub fn with_parameters(mut operation: Value, parameters: Vec<Value>) -> Value {
    operation["parameters"] = Value::Array(parameters);
    operation
}

/// An operation answering 204 with no content.
pub fn no_content(tag: &str, summary: &str) -> Value {
    json!({
        "summary": summary,
        "tags": [tag],
        "responses": {
            "204": {"description": summary},
            "default": {
                "description": "Error",
                "content": {"application/json": {"schema": reference("ErrorResponse")}}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_shape() {
        let op = with_body(
            operation("Books", "Create book", "201", reference("Book")),
            json_body("BookInput"),
        );
        assert_eq!(op["tags"][0], "Books");
        assert_eq!(op["responses"]["201"]["content"]["application/json"]["schema"]["$ref"], "#/components/schemas/Book");
        assert_eq!(op["requestBody"]["content"]["application/json"]["schema"]["$ref"], "#/components/schemas/BookInput");
        assert!(op["responses"]["default"].is_object());
    }
}
