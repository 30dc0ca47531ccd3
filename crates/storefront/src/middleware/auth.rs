//! Bearer token authentication.
//!
//! Tokens are issued by the hosted auth backend and signed HS256 with the
//! shared JWT secret. Handlers opt in by taking [`RequireUser`] or
//! [`RequireAdmin`] as an argument.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use herbwell_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Role that unlocks the admin API.
pub const ADMIN_ROLE: &str = "admin";

/// Claims read from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: u64,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.app_metadata.role,
        }
    }
}

/// Extractor that requires a valid bearer token. Rejects with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> String {
///     user.id.to_string()
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires a valid bearer token with the admin role.
/// Rejects with 401 without a token and 403 for other roles.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        let (key, validation) = state.jwt();
        let claims = jsonwebtoken::decode::<Claims>(token, key, validation)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized("invalid or expired token".to_string())
            })?
            .claims;

        let user = CurrentUser::from(claims);
        set_sentry_user(&user.id, user.email.as_deref());
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }
        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_without_metadata_are_not_admin() {
        let json = r#"{"sub":"6f1c2f43-43a3-4a9e-9d5c-0f0c1f2d3e4a","exp":4102444800}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert!(!CurrentUser::from(claims).is_admin());
    }

    #[test]
    fn test_admin_role() {
        let json = r#"{"sub":"6f1c2f43-43a3-4a9e-9d5c-0f0c1f2d3e4a","exp":4102444800,"email":"ops@herbwell.test","app_metadata":{"role":"admin"}}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        let user = CurrentUser::from(claims);
        assert!(user.is_admin());
        assert_eq!(user.email.as_deref(), Some("ops@herbwell.test"));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let request = axum::http::Request::builder()
            .header(AUTHORIZATION, "Bearer abc.def.ghi")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));

        let request = axum::http::Request::builder()
            .header(AUTHORIZATION, "Basic abc")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
