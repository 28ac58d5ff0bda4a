use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::services::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    /// Anonymous session from the identity provider; read-only.
    Guest,
    Admin,
}

/// Claims of a token minted by the external identity provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

impl JwtClaims {
    pub fn actor(&self) -> String {
        self.email.clone().unwrap_or_else(|| self.sub.clone())
    }

    /// Guests and admins skip the email verification requirement.
    fn is_verified(&self) -> bool {
        self.email_verified || matches!(self.role, Role::Guest | Role::Admin)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Email address not verified")]
    EmailNotVerified,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Local tooling and tests only; production tokens come from the provider.
    pub fn generate_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let claims = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })?;

        if !claims.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }
        Ok(claims)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Validates the bearer token and stores [`JwtClaims`] in request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = bearer_token(&headers).ok_or((
        StatusCode::UNAUTHORIZED,
        AuthError::MissingToken.to_string(),
    ))?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let claims = jwt_service.validate_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        (StatusCode::UNAUTHORIZED, e.to_string())
    })?;

    tracing::debug!(user_id = %claims.sub, role = ?claims.role, "Authenticated request");

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Guests may read but never write.
pub async fn read_only_guard_middleware(
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let is_guest = request
        .extensions()
        .get::<JwtClaims>()
        .is_some_and(|claims| claims.role == Role::Guest);
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS);

    if is_guest && !is_read {
        tracing::warn!(method = %request.method(), path = %request.uri().path(), "Guest write rejected");
        return Err((
            StatusCode::FORBIDDEN,
            "Guest accounts are read-only".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

pub async fn admin_guard_middleware(
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let claims = request.extensions().get::<JwtClaims>();
    if let Some(claims) = claims {
        if claims.role == Role::Admin {
            return Ok(next.run(request).await);
        }
    }
    tracing::warn!("Access denied: admin role required");
    Err((StatusCode::FORBIDDEN, "Admin role required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, email_verified: bool) -> JwtClaims {
        let now = chrono::Utc::now().timestamp();
        JwtClaims {
            sub: "user123".to_string(),
            email: Some("user@example.com".to_string()),
            email_verified,
            role,
            exp: (now + 3600) as usize,
            iat: now as usize,
        }
    }

    #[test]
    fn verified_token_round_trips() {
        let service = JwtService::new("test-secret");
        let token = service.generate_token(&claims(Role::Student, true)).unwrap();
        let validated = service.validate_token(&token).unwrap();

        assert_eq!(validated.sub, "user123");
        assert_eq!(validated.role, Role::Student);
    }

    #[test]
    fn unverified_student_is_rejected_but_guest_is_not() {
        let service = JwtService::new("test-secret");

        let student = service.generate_token(&claims(Role::Student, false)).unwrap();
        assert_eq!(
            service.validate_token(&student).unwrap_err(),
            AuthError::EmailNotVerified
        );

        let guest = service.generate_token(&claims(Role::Guest, false)).unwrap();
        assert!(service.validate_token(&guest).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = JwtService::new("one")
            .generate_token(&claims(Role::Admin, true))
            .unwrap();
        assert_eq!(
            JwtService::new("two").validate_token(&token).unwrap_err(),
            AuthError::InvalidSignature
        );
    }
}
