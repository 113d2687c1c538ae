use serde::{Deserialize, Serialize};

use crate::utils::non_empty;
use crate::utils::validation::{Validator, NAME_MAX, TEXT_MAX, URL_MAX};

pub const AUTHORS: &str = "authors";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorInput {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    pub nationality: Option<String>,
    pub photo_url: Option<String>,
    pub website: Option<String>,
}

impl AuthorInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("name", &self.name, NAME_MAX)
            .optional("bio", Some(&self.bio), TEXT_MAX)
            .optional("nationality", self.nationality.as_deref(), 60)
            .optional("photo_url", self.photo_url.as_deref(), URL_MAX)
            .optional("website", self.website.as_deref(), URL_MAX);
        if let Some(website) = self.website.as_deref().filter(|w| !w.trim().is_empty()) {
            let website = website.trim();
            v.check(
                website.starts_with("https://") || website.starts_with("http://"),
                "website",
                "must be an http(s) URL",
            );
        }
        v
    }

    pub fn into_author(self) -> Author {
        Author {
            name: self.name.trim().to_string(),
            bio: self.bio.trim().to_string(),
            nationality: non_empty(self.nationality),
            photo_url: non_empty(self.photo_url),
            website: non_empty(self.website),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_website_must_be_http() {
        let input = AuthorInput {
            name: "Elvira Lindo".into(),
            bio: String::new(),
            nationality: Some("ES".into()),
            photo_url: None,
            website: Some("ftp://elviralindo.es".into()),
        };
        assert!(!input.validate().is_valid());

        let input = AuthorInput {
            website: Some("https://elviralindo.es".into()),
            ..input
        };
        assert!(input.validate().is_valid());
    }
}
