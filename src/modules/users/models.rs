use alicia_authz::{Principal, Role};
use serde::{Deserialize, Serialize};

use crate::utils::validation::{NAME_MAX, Validator};

pub const USERS: &str = "users";

/// A marketplace account. `loyalty_points` is only changed through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub loyalty_points: i64,
}

impl User {
    pub fn principal(&self, user_id: &str) -> Principal {
        Principal {
            user_id: user_id.to_string(),
            role: self.role,
            library_id: self.library_id.clone(),
            author_id: self.author_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl SignUp {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        v.required("name", &self.name, NAME_MAX)
            .email("email", &self.email)
            .check(self.role.self_assignable(), "role", "cannot be chosen at sign-up");
        v
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Validator {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.required("name", name, NAME_MAX);
        }
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        v
    }
}

/// Admin-only change of role and tenant links.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    pub library_id: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserListParams {
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cannot_be_self_assigned() {
        let signup = SignUp {
            name: "Lucía".into(),
            email: "lucia@example.com".into(),
            role: Role::Admin,
        };
        assert!(!signup.validate().is_valid());

        let signup = SignUp {
            role: Role::Library,
            ..signup
        };
        assert!(signup.validate().is_valid());
    }

    #[test]
    fn test_missing_fields_default() {
        let user: User =
            serde_json::from_str(r#"{"name": "Pablo", "email": "pablo@example.com"}"#).unwrap();
        assert_eq!(user.role, Role::Reader);
        assert_eq!(user.loyalty_points, 0);
        assert_eq!(user.principal("u1").library_id, None);
    }
}
