use serde::{Deserialize, Serialize};

use crate::utils::non_empty;
use crate::utils::validation::{
    Validator, MONEY_MAX, NAME_MAX, STOCK_MAX, TEXT_MAX, TITLE_MAX, URL_MAX,
};

pub const BOOKS: &str = "books";

/// Most rows accepted by one bulk upload.
pub const BULK_LIMIT: usize = 500;

/// A physical book on sale at one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub library_id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// Editable book fields, shared by single and bulk submissions.
#[derive(Debug, Clone, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    #[serde(default)]
    pub description: String,
    pub genre: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub cover_url: Option<String>,
}

impl BookFields {
    /// Record the field errors, naming fields `{prefix}{field}`.
    pub fn validate_into(&self, v: &mut Validator, prefix: &str) {
        let field = |name: &str| format!("{prefix}{name}");
        v.required(&field("title"), &self.title, TITLE_MAX)
            .required(&field("author"), &self.author, NAME_MAX)
            .optional(&field("description"), Some(&self.description), TEXT_MAX)
            .optional(&field("genre"), self.genre.as_deref(), 60)
            .optional(&field("cover_url"), self.cover_url.as_deref(), URL_MAX)
            .positive(&field("price_cents"), self.price_cents)
            .at_most(&field("price_cents"), self.price_cents, MONEY_MAX)
            .non_negative(&field("stock"), self.stock)
            .at_most(&field("stock"), self.stock, STOCK_MAX);
        if let Some(isbn) = self.isbn.as_deref().filter(|i| !i.trim().is_empty()) {
            v.check(valid_isbn(isbn), &field("isbn"), "must be an ISBN-10 or ISBN-13");
        }
    }

    pub fn into_book(self, library_id: String) -> Book {
        Book {
            library_id,
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            isbn: non_empty(self.isbn).map(|isbn| isbn.replace(['-', ' '], "")),
            description: self.description.trim().to_string(),
            genre: non_empty(self.genre),
            price_cents: self.price_cents,
            stock: self.stock,
            cover_url: non_empty(self.cover_url),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    pub library_id: String,
    #[serde(flatten)]
    pub fields: BookFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpload {
    pub library_id: String,
    pub books: Vec<BookFields>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub created: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookListParams {
    pub library_id: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    /// Case-insensitive title/author search.
    pub q: Option<String>,
    pub in_stock: Option<bool>,
    pub limit: Option<usize>,
}

/// Digits with an optional trailing `X` for ISBN-10; hyphens and spaces ignored.
pub fn valid_isbn(raw: &str) -> bool {
    let isbn: Vec<char> = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();
    match isbn.len() {
        10 => {
            isbn[..9].iter().all(char::is_ascii_digit)
                && (isbn[9].is_ascii_digit() || isbn[9] == 'X' || isbn[9] == 'x')
        }
        13 => isbn.iter().all(char::is_ascii_digit),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> BookFields {
        BookFields {
            title: " Nada ".into(),
            author: "Carmen Laforet".into(),
            isbn: Some("978-84-233-4365-9".into()),
            description: String::new(),
            genre: Some("  ".into()),
            price_cents: 1_890,
            stock: 4,
            cover_url: None,
        }
    }

    #[test]
    fn test_isbn_formats() {
        assert!(valid_isbn("978-84-233-4365-9"));
        assert!(valid_isbn("84-233-4365-X"));
        assert!(!valid_isbn("12345"));
        assert!(!valid_isbn("97884233436AB"));
    }

    #[test]
    fn test_into_book_normalizes() {
        let book = fields().into_book("lib-1".into());
        assert_eq!(book.title, "Nada");
        assert_eq!(book.isbn.as_deref(), Some("9788423343659"));
        assert_eq!(book.genre, None);
    }

    #[test]
    fn test_prefixed_field_names() {
        let mut bad = fields();
        bad.price_cents = 0;
        let mut v = Validator::new();
        bad.validate_into(&mut v, "books[2].");
        match v.finish("invalid").unwrap_err() {
            alicia_http::AppError::Validation { details, .. } => {
                assert_eq!(details[0]["field"], "books[2].price_cents");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_price_ceiling() {
        let mut at_ceiling = fields();
        at_ceiling.price_cents = MONEY_MAX;
        let mut v = Validator::new();
        at_ceiling.validate_into(&mut v, "");
        assert!(v.is_valid());

        let mut above = fields();
        above.price_cents = 100_000_000_000_000_000;
        above.stock = STOCK_MAX + 1;
        let mut v = Validator::new();
        above.validate_into(&mut v, "");
        match v.finish("invalid").unwrap_err() {
            alicia_http::AppError::Validation { details, .. } => {
                assert_eq!(details[0]["field"], "price_cents");
                assert_eq!(details[1]["field"], "stock");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
