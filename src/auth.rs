use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;

const USER_ID_HEADER: &str = "x-user-id";

/// The acting principal, resolved by the external identity provider and
/// handed to us as a header. Role checks happen per-endpoint via the
/// `require_*` guards.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn require_customer(&self) -> Result<(), AppError> {
        self.require_role(Role::Customer)
    }

    pub fn require_owner(&self) -> Result<(), AppError> {
        self.require_role(Role::Owner)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(Role::Admin)
    }

    fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Requires {:?} role",
                role
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing X-User-Id header".to_string()))?;

        let user_id = Uuid::parse_str(raw)
            .map_err(|_| AppError::Auth("Malformed X-User-Id header".to_string()))?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::Auth("Unknown principal".to_string()))?;

        Ok(AuthUser(user))
    }
}
