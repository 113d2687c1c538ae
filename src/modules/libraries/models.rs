use serde::{Deserialize, Serialize};

use crate::utils::validation::{Validator, NAME_MAX, TEXT_MAX, TITLE_MAX, URL_MAX};

pub const LIBRARIES: &str = "libraries";

/// An independent bookstore (tenant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub owner_id: String,
}

/// Create/replace payload; slug and owner are derived server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
}

impl LibraryInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("name", &self.name, NAME_MAX)
            .optional("description", Some(&self.description), TEXT_MAX)
            .required("address", &self.address, TITLE_MAX)
            .required("city", &self.city, NAME_MAX)
            .optional("phone", self.phone.as_deref(), 40)
            .optional("image_url", self.image_url.as_deref(), URL_MAX);
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            v.email("email", email);
        }
        v
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryListParams {
    pub city: Option<String>,
}
