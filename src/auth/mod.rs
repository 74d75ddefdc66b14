/*!
 * # Authentication and Authorization Module
 *
 * Session tokens are HS256 JWTs carrying the user id, username and role.
 * Passwords are stored as argon2id PHC strings.
 *
 * Protected routers are wrapped with [`AuthRouterExt::with_auth`] or
 * [`AuthRouterExt::with_role`]. The middleware resolves the bearer token to a
 * [`CurrentUser`] and stores it in the request extensions, where handlers pick
 * it up through the `CurrentUser` extractor.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::entities::user;
use crate::errors::ServiceError;

mod password;
mod rbac;

pub use password::{hash_password, verify_password};
pub use rbac::{has_role, Role};

/// Fixed credential accepted only when `auth_test_mode` is enabled
pub const TEST_TOKEN: &str = "test_token";
const TEST_USER_ID: i32 = 999;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub username: String, // Login name at issue time
    pub role: String,     // USER | MANAGER | ADMIN
    pub iat: i64,         // Issued at time
    pub exp: i64,         // Expiration time
}

/// Identity carried by a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: i32,
    pub username: String,
    pub role: String,
}

/// Authenticated user resolved by the auth middleware
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
}

impl CurrentUser {
    pub fn has_role(&self, required: Role) -> bool {
        has_role(&self.role, required)
    }

    /// MANAGER or above
    pub fn is_privileged(&self) -> bool {
        self.has_role(Role::Manager)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    fn test_user() -> Self {
        Self {
            id: TEST_USER_ID,
            username: "test_user".to_string(),
            email: "test@example.com".to_string(),
            role: Role::User.to_string(),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            is_active: true,
        }
    }
}

impl From<user::Model> for CurrentUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role: model.role,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration: Duration,
    /// Accept [`TEST_TOKEN`] as a synthetic USER identity
    pub test_mode: bool,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
            test_mode: cfg.auth_test_mode,
        }
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Signs a session token for `user`, valid for the configured lifetime.
    pub fn issue_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + self.config.token_expiration.as_secs() as i64,
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Decodes a token. `None` when malformed, wrongly signed or expired.
    pub fn decode_token(&self, token: &str) -> Option<TokenIdentity> {
        if self.config.test_mode && token == TEST_TOKEN {
            let user = CurrentUser::test_user();
            return Some(TokenIdentity {
                user_id: user.id,
                username: user.username,
                role: user.role,
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| debug!("Rejected session token: {}", e))
        .ok()?
        .claims;

        Some(TokenIdentity {
            user_id: claims.sub.parse().ok()?,
            username: claims.username,
            role: claims.role,
        })
    }

    /// Resolves the bearer token in `headers` to an active user.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let identity = self.decode_token(token).ok_or(AuthError::InvalidToken)?;

        if self.config.test_mode && token == TEST_TOKEN {
            return Ok(CurrentUser::test_user());
        }

        let user = user::Entity::find_by_id(identity.user_id)
            .one(&*self.db)
            .await
            .map_err(AuthError::DatabaseError)?
            .filter(|u| u.is_active)
            .ok_or(AuthError::UserNotFound)?;

        Ok(user.into())
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found or inactive")]
    UserNotFound,

    #[error("Insufficient permissions. Required: {0}")]
    InsufficientRole(Role),

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Database error: {0}")]
    DatabaseError(#[source] DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::UserNotFound => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::InsufficientRole(_) => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            AuthError::DatabaseError(source) => ServiceError::DatabaseError {
                context: "Internal server error".to_string(),
                source,
            },
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Authentication middleware that resolves the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            error!("Authentication service not available in request extensions");
            return AuthError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    match auth_service.authenticate(request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthError::MissingToken)?;

    if !user.has_role(required_role) {
        return Err(AuthError::InsufficientRole(required_role));
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.route_layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service(test_mode: bool) -> AuthService {
        // Token paths below never reach the store
        let db = DatabaseConnection::Disconnected;
        AuthService::new(
            AuthConfig {
                jwt_secret: "unit-test-secret-with-enough-entropy-123".into(),
                token_expiration: Duration::from_secs(3600),
                test_mode,
            },
            Arc::new(db),
        )
    }

    fn user(role: Role) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 7,
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: String::new(),
            role: role.to_string(),
            is_active: true,
            first_name: None,
            last_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_decodes_to_identity() {
        let svc = service(false);
        let token = svc.issue_token(&user(Role::Manager)).unwrap();
        let identity = svc.decode_token(&token).unwrap();
        assert_eq!(
            identity,
            TokenIdentity {
                user_id: 7,
                username: "alice".into(),
                role: "MANAGER".into(),
            }
        );
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let svc = service(false);
        let now = Utc::now().timestamp();
        let expired = svc
            .encode_claims(&Claims {
                sub: "7".into(),
                username: "alice".into(),
                role: "USER".into(),
                iat: now - 7200,
                exp: now - 10,
            })
            .unwrap();
        assert!(svc.decode_token(&expired).is_none());

        let mut other = service(false);
        other.config.jwt_secret = "a-different-secret-for-signing-tokens-99".into();
        let foreign = other.issue_token(&user(Role::User)).unwrap();
        assert!(svc.decode_token(&foreign).is_none());
        assert!(svc.decode_token("garbage").is_none());
    }

    #[test]
    fn sentinel_token_requires_test_mode() {
        assert!(service(false).decode_token(TEST_TOKEN).is_none());
        let identity = service(true).decode_token(TEST_TOKEN).unwrap();
        assert_eq!(identity.user_id, 999);
        assert_eq!(identity.role, "USER");
    }

    #[tokio::test]
    async fn authenticate_reports_missing_and_invalid_tokens() {
        let svc = service(true);

        let headers = HeaderMap::new();
        assert!(matches!(
            svc.authenticate(&headers).await,
            Err(AuthError::MissingToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(matches!(
            svc.authenticate(&headers).await,
            Err(AuthError::MissingToken)
        ));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer nonsense"),
        );
        assert!(matches!(
            svc.authenticate(&headers).await,
            Err(AuthError::InvalidToken)
        ));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer test_token"),
        );
        let current = svc.authenticate(&headers).await.unwrap();
        assert_eq!(current.id, 999);
        assert_eq!(current.email, "test@example.com");
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        use axum::http::StatusCode;
        assert_eq!(
            ServiceError::from(AuthError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        let forbidden = ServiceError::from(AuthError::InsufficientRole(Role::Admin));
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            forbidden.response_message(),
            "Insufficient permissions. Required: ADMIN"
        );
    }
}
