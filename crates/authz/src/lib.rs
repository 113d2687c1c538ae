//! Authorization guards for marketplace tenants.
//!
//! Identity is established upstream; handlers receive a [`Principal`] and ask
//! it whether an action on a tenant-owned resource is allowed. Admins pass
//! every guard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Reader,
    Library,
    Author,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Library => "library",
            Role::Author => "author",
            Role::Admin => "admin",
        }
    }

    /// Roles a user may pick when signing up.
    pub fn self_assignable(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("not allowed to {0}")]
    Forbidden(String),
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// Library the user works for, for `Role::Library`.
    pub library_id: Option<String>,
    /// Author profile the user manages, for `Role::Author`.
    pub author_id: Option<String>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn deny(&self, action: &str) -> AuthzError {
        tracing::debug!(user_id = %self.user_id, role = self.role.as_str(), action, "authorization denied");
        AuthzError::Forbidden(action.to_string())
    }

    pub fn require_admin(&self, action: &str) -> Result<(), AuthzError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(self.deny(action))
        }
    }

    pub fn require_role(&self, allowed: &[Role], action: &str) -> Result<(), AuthzError> {
        if self.is_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(self.deny(action))
        }
    }

    /// The caller acts on their own account.
    pub fn ensure_self(&self, user_id: &str, action: &str) -> Result<(), AuthzError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(self.deny(action))
        }
    }

    /// The caller is staff of `library_id`.
    pub fn ensure_library_staff(&self, library_id: &str, action: &str) -> Result<(), AuthzError> {
        let is_staff =
            self.role == Role::Library && self.library_id.as_deref() == Some(library_id);
        if self.is_admin() || is_staff {
            Ok(())
        } else {
            Err(self.deny(action))
        }
    }

    /// The caller may manage content attributed to `author_id`.
    ///
    /// Authors without a linked profile may only manage unattributed content.
    pub fn ensure_author(&self, author_id: Option<&str>, action: &str) -> Result<(), AuthzError> {
        let is_author = self.role == Role::Author && self.author_id.as_deref() == author_id;
        if self.is_admin() || is_author {
            Ok(())
        } else {
            Err(self.deny(action))
        }
    }
}
