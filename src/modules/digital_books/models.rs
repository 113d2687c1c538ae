use serde::{Deserialize, Serialize};

use crate::utils::non_empty;
use crate::utils::validation::{Validator, MONEY_MAX, NAME_MAX, TEXT_MAX, TITLE_MAX, URL_MAX};

pub const DIGITAL_BOOKS: &str = "digital_books";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitalFormat {
    Epub,
    Pdf,
    Audiobook,
}

impl DigitalFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigitalFormat::Epub => "epub",
            DigitalFormat::Pdf => "pdf",
            DigitalFormat::Audiobook => "audiobook",
        }
    }

    /// Content types accepted for the downloadable file.
    pub fn content_types(&self) -> &'static [&'static str] {
        match self {
            DigitalFormat::Epub => &["application/epub+zip"],
            DigitalFormat::Pdf => &["application/pdf"],
            DigitalFormat::Audiobook => &["audio/mpeg", "audio/mp4", "audio/x-m4a", "audio/wav"],
        }
    }
}

/// A catalog entry for an ebook or audiobook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalBook {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub author_name: String,
    #[serde(default)]
    pub description: String,
    pub format: DigitalFormat,
    /// Zero means free.
    pub price_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigitalBookInput {
    pub title: String,
    pub author_id: Option<String>,
    pub author_name: String,
    #[serde(default)]
    pub description: String,
    pub format: DigitalFormat,
    #[serde(default)]
    pub price_cents: i64,
    pub cover_url: Option<String>,
}

impl DigitalBookInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("title", &self.title, TITLE_MAX)
            .required("author_name", &self.author_name, NAME_MAX)
            .optional("description", Some(&self.description), TEXT_MAX)
            .optional("cover_url", self.cover_url.as_deref(), URL_MAX)
            .non_negative("price_cents", self.price_cents)
            .at_most("price_cents", self.price_cents, MONEY_MAX);
        v
    }

    pub fn into_record(self, author_id: Option<String>, file_url: Option<String>) -> DigitalBook {
        DigitalBook {
            title: self.title.trim().to_string(),
            author_id,
            author_name: self.author_name.trim().to_string(),
            description: self.description.trim().to_string(),
            format: self.format,
            price_cents: self.price_cents,
            cover_url: non_empty(self.cover_url),
            file_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigitalBookListParams {
    pub format: Option<DigitalFormat>,
    pub author_id: Option<String>,
    pub free: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_is_rejected() {
        let raw = r#"{"title": "x", "author_name": "y", "format": "mobi"}"#;
        assert!(serde_json::from_str::<DigitalBookInput>(raw).is_err());
    }

    #[test]
    fn test_free_books_are_valid() {
        let input: DigitalBookInput = serde_json::from_str(
            r#"{"title": "Platero y yo", "author_name": "Juan Ramón Jiménez", "format": "epub"}"#,
        )
        .unwrap();
        assert_eq!(input.price_cents, 0);
        assert!(input.validate().is_valid());
        assert!(DigitalFormat::Audiobook.content_types().contains(&"audio/mpeg"));
    }
}
