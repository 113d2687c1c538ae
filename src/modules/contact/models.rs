use serde::{Deserialize, Serialize};

use crate::utils::non_empty;
use crate::utils::validation::{Validator, NAME_MAX, TEXT_MAX, TITLE_MAX};

pub const CONTACT_MESSAGES: &str = "contact_messages";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("name", &self.name, NAME_MAX)
            .email("email", &self.email)
            .optional("subject", self.subject.as_deref(), TITLE_MAX)
            .required("message", &self.message, TEXT_MAX);
        v
    }

    pub fn into_message(self) -> ContactMessage {
        ContactMessage {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            subject: non_empty(self.subject),
            message: self.message.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactReceipt {
    pub id: String,
    pub received: bool,
}
