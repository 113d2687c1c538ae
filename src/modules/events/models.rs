use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::non_empty;
use crate::utils::validation::{Validator, TEXT_MAX, TITLE_MAX, URL_MAX};

pub const EVENTS: &str = "events";

/// A reading, signing or club meeting hosted by a library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub library_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub library_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub image_url: Option<String>,
}

impl EventInput {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("title", &self.title, TITLE_MAX)
            .optional("description", Some(&self.description), TEXT_MAX)
            .required("location", &self.location, TITLE_MAX)
            .optional("image_url", self.image_url.as_deref(), URL_MAX)
            .window("ends_at", self.starts_at, self.ends_at);
        if let Some(capacity) = self.capacity {
            v.positive("capacity", capacity);
        }
        v
    }

    pub fn into_event(self) -> Event {
        Event {
            library_id: self.library_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            capacity: self.capacity,
            image_url: non_empty(self.image_url),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventListParams {
    pub library_id: Option<String>,
    /// Only events that have not finished yet.
    pub upcoming: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_and_capacity() {
        let starts_at = Utc::now();
        let input = EventInput {
            library_id: "lib-1".into(),
            title: "Club de lectura".into(),
            description: String::new(),
            location: "Sala 2".into(),
            starts_at,
            ends_at: starts_at - Duration::minutes(30),
            capacity: Some(0),
            image_url: None,
        };
        assert!(!input.validate().is_valid());

        let input = EventInput {
            ends_at: starts_at + Duration::hours(2),
            capacity: Some(25),
            ..input
        };
        assert!(input.validate().is_valid());
    }
}
