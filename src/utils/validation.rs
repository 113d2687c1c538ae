use alicia_http::AppError;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub const NAME_MAX: usize = 120;
pub const TITLE_MAX: usize = 200;
pub const TEXT_MAX: usize = 5_000;
pub const URL_MAX: usize = 2_048;

/// Ceiling for any price or money amount, in cents.
pub const MONEY_MAX: i64 = 1_000_000_000;
/// Ceiling for point costs and single balance adjustments.
pub const POINTS_MAX: i64 = 1_000_000_000;
pub const STOCK_MAX: i64 = 1_000_000;

/// Collects field-level errors and turns them into one 422 response.
#[derive(Debug, Default)]
pub struct Validator {
    details: Vec<Value>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, error: impl Into<String>) {
        self.details
            .push(json!({"field": field, "error": error.into()}));
    }

    pub fn check(&mut self, ok: bool, field: &str, error: &str) -> &mut Self {
        if !ok {
            self.fail(field, error);
        }
        self
    }

    /// Non-empty after trimming and at most `max_chars` characters.
    pub fn required(&mut self, field: &str, value: &str, max_chars: usize) -> &mut Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(field, "required");
        } else if trimmed.chars().count() > max_chars {
            self.fail(field, format!("must be at most {max_chars} characters"));
        }
        self
    }

    pub fn optional(&mut self, field: &str, value: Option<&str>, max_chars: usize) -> &mut Self {
        if let Some(value) = value {
            if value.trim().chars().count() > max_chars {
                self.fail(field, format!("must be at most {max_chars} characters"));
            }
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value > 0, field, "must be greater than zero")
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value >= 0, field, "must not be negative")
    }

    pub fn at_most(&mut self, field: &str, value: i64, max: i64) -> &mut Self {
        if value > max {
            self.fail(field, format!("must be at most {max}"));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let value = value.trim();
        let valid = value
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            })
            && !value.contains(char::is_whitespace);
        if value.is_empty() {
            self.fail(field, "required");
        } else if !valid {
            self.fail(field, "must be a valid email address");
        }
        self
    }

    /// `starts_at` strictly before `ends_at`.
    pub fn window(&mut self, field: &str, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> &mut Self {
        self.check(starts_at < ends_at, field, "must end after it starts")
    }

    pub fn is_valid(&self) -> bool {
        self.details.is_empty()
    }

    pub fn finish(self, message: &str) -> Result<(), AppError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.details, message))
        }
    }
}

/// URL-friendly slug: lowercase ASCII, Spanish accents folded, words joined by `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        };
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }
    slug
}
