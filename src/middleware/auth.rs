use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, models::Role};

/// Authenticated principal threaded into every lifecycle call. The role is
/// parsed into the closed enum when the token is decoded; an unknown role
/// string never reaches the engines.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn ensure_role(user: &AuthUser, role: Role, action: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!(
            "only a {role} can {action}"
        )));
    }
    Ok(())
}

pub fn ensure_farmer(user: &AuthUser, action: &str) -> Result<(), AppError> {
    ensure_role(user, Role::Farmer, action)
}

pub fn ensure_buyer(user: &AuthUser, action: &str) -> Result<(), AppError> {
    ensure_role(user, Role::Buyer, action)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Validation("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Validation("Invalid Authorization header".into()))?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::Validation("Invalid Authorization scheme".into()));
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Validation("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Validation("Invalid user id in token".into()))?;

        let role = decoded
            .claims
            .role
            .parse::<Role>()
            .map_err(AppError::Validation)?;

        Ok(AuthUser { user_id, role })
    }
}
