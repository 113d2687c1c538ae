use serde::de::DeserializeOwned;

use crate::error::{GenAiError, GenAiResult};
use crate::model::{GenerativeModel, TextRequest};

/// Generate text against a declared schema and decode it into `T`.
pub async fn generate_structured<T: DeserializeOwned>(
    model: &dyn GenerativeModel,
    request: &TextRequest,
) -> GenAiResult<T> {
    let raw = model.generate_text(request).await?;
    parse_json_output(&raw)
}

/// Decode model output as JSON, tolerating a surrounding markdown code fence.
pub fn parse_json_output<T: DeserializeOwned>(raw: &str) -> GenAiResult<T> {
    let body = strip_code_fence(raw);
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(error = %e, output_len = raw.len(), "model output failed to parse");
        GenAiError::InvalidOutput(e.to_string())
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);

    // A language tag (```json) ends at whitespace or where the JSON opens, on
    // the same line or the next one. A bare value such as ```true``` is kept.
    let tag_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    let after_tag = &body[tag_len..];
    let opens_after_tag =
        after_tag.starts_with(char::is_whitespace) || after_tag.starts_with(['{', '[']);
    if tag_len > 0 && opens_after_tag && !after_tag.trim().is_empty() {
        after_tag.trim()
    } else {
        body.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        text: String,
    }

    #[test]
    fn test_bare_json() {
        let post: Post = parse_json_output(r#" {"text": "hola"} "#).unwrap();
        assert_eq!(post.text, "hola");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"text\": \"¡Nuevo club de lectura!\"}\n```\n";
        let post: Post = parse_json_output(raw).unwrap();
        assert_eq!(post.text, "¡Nuevo club de lectura!");
    }

    #[test]
    fn test_single_line_fence() {
        for raw in [
            r#"```{"text":"x"}```"#,
            r#"```json {"text":"x"}```"#,
            r#"```json{"text":"x"}```"#,
            "```\n{\"text\":\"x\"}```",
        ] {
            let post: Post = parse_json_output(raw).unwrap();
            assert_eq!(post.text, "x", "{raw}");
        }
        assert!(parse_json_output::<bool>("```true```").unwrap());
        assert_eq!(parse_json_output::<Vec<u8>>("```json [1, 2]```").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_invalid_shape() {
        let err = parse_json_output::<Post>("{\"body\": 1}").unwrap_err();
        assert!(matches!(err, GenAiError::InvalidOutput(_)));
    }
}
