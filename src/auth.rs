//! Caller identity extractors.
//!
//! The identity proxy in front of the service authenticates the caller and
//! forwards the user id in the configured header (`x-user-id` by default).

use std::ops::Deref;

use alicia_authz::{AuthzError, Principal};
use alicia_db::Entity;
use alicia_http::AppError;
use alicia_kernel::AppContext;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::modules::users::models::{User, USERS};

/// The authenticated caller; rejects with 401 when absent or unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub principal: Principal,
    pub user: Entity<User>,
}

impl Deref for CurrentUser {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, app: &AppContext) -> Result<Self, Self::Rejection> {
        let user_id = caller_id(&parts.headers, app).ok_or(AuthzError::Unauthenticated)?;

        let Some(user) = app.collection::<User>(USERS).get(&user_id).await? else {
            tracing::debug!(%user_id, "caller header names an unknown user");
            return Err(AuthzError::Unauthenticated.into());
        };

        Ok(Self {
            principal: user.principal(&user.id),
            user,
        })
    }
}

/// User id forwarded by the identity proxy, if any.
pub fn caller_id(headers: &HeaderMap, app: &AppContext) -> Option<String> {
    headers
        .get(app.settings.auth.user_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
