//! Caller identity extractor.
//!
//! Authentication itself is external: an upstream gateway authenticates
//! the caller and injects `x-user-id` and `x-user-role` headers. This
//! extractor materializes them; handlers that mutate state additionally
//! call [`AuthContext::require_admin`].

use anyhow::anyhow;
use axum::http::{StatusCode, request::Parts};
use axum::extract::FromRequestParts;

use classrota_core::{AppError, ErrorCode};
use classrota_models::{UserId, ViewerRole};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity of the caller, as supplied by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: ViewerRole,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == ViewerRole::Admin
    }

    /// Reject non-admin callers with 403.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::new(
                ErrorCode::Validation,
                anyhow!("This operation requires administrator access"),
            )
            .with_status(StatusCode::FORBIDDEN))
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = |msg: &str| {
            AppError::new(ErrorCode::Validation, anyhow!("{}", msg.to_string()))
                .with_status(StatusCode::UNAUTHORIZED)
        };

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthorized("Missing x-user-id header"))?
            .parse::<UserId>()
            .map_err(|_| unauthorized("Invalid x-user-id header"))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthorized("Missing x-user-role header"))?
            .parse::<ViewerRole>()
            .map_err(|_| unauthorized("Invalid x-user-role header"))?;

        Ok(AuthContext { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_check() {
        let ctx = AuthContext {
            user_id: UserId::new(),
            role: ViewerRole::Admin,
        };
        assert!(ctx.require_admin().is_ok());

        let ctx = AuthContext {
            user_id: UserId::new(),
            role: ViewerRole::Teacher,
        };
        let err = ctx.require_admin().unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
