use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Conflict",
    "message": "Cannot delete supplier with existing products",
    "details": "This supplier has 3 associated products",
    "dependentCount": 3,
    "request_id": "5b0f4c1e-7d0c-4a51-9d55-0f4f8a4f6a11",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail for conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Number of dependent records blocking a delete
    #[serde(
        rename = "dependentCount",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub dependent_count: Option<u64>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Delete blocked by child rows
    #[error("{message}")]
    HasDependents {
        message: String,
        details: Option<String>,
        count: u64,
    },

    #[error("{context}: {source}")]
    DatabaseError {
        context: String,
        #[source]
        source: DbErr,
    },

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::DatabaseError {
            context: "Database error".to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::HasDependents { .. } => StatusCode::CONFLICT,
            Self::DatabaseError { .. }
            | Self::HashError(_)
            | Self::JwtError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError { context, .. } => context.clone(),
            Self::HashError(_) | Self::JwtError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        let status = self.status_code();
        let (details, dependent_count) = match self {
            Self::HasDependents { details, count, .. } => (details.clone(), Some(*count)),
            _ => (None, None),
        };

        ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details,
            dependent_count,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            // Full error text stays in the server log
            error!(error = %self, "request failed");
        }

        (status, Json(self.to_error_response())).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
            ApiError::BadRequest { message } => ServiceError::BadRequest(message).into_response(),
        }
    }
}

/// Store-level failure categories the handlers care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Unique constraint violated; carries the offending column list
    UniqueViolation(String),
    ForeignKeyViolation,
    RecordNotFound,
    Other,
}

/// Classifies a sea-orm error by inspecting the driver error code.
pub fn classify_db_err(err: &DbErr) -> StoreErrorKind {
    match err {
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => StoreErrorKind::RecordNotFound,
        _ => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                StoreErrorKind::UniqueViolation(unique_target(&detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => StoreErrorKind::ForeignKeyViolation,
            _ => StoreErrorKind::Other,
        },
    }
}

/// Extracts the violated column names from a driver message.
///
/// SQLite reports `UNIQUE constraint failed: products.sku`, PostgreSQL reports
/// the constraint name (`products_sku_key`).
fn unique_target(detail: &str) -> String {
    if let Some((_, columns)) = detail.split_once("failed:") {
        let names: Vec<&str> = columns
            .split(',')
            .map(|c| c.trim())
            .map(|c| c.rsplit('.').next().unwrap_or(c))
            .filter(|c| !c.is_empty())
            .collect();
        if !names.is_empty() {
            return names.join(", ");
        }
    }

    let quoted = detail.split('"').nth(1);
    if let Some(constraint) = quoted {
        let trimmed = constraint.trim_end_matches("_key");
        if let Some(column) = trimmed.rsplit('_').next() {
            if !column.is_empty() {
                return column.to_string();
            }
        }
    }

    "fields".to_string()
}

/// Describes how a single store operation maps failures onto the API taxonomy.
#[derive(Debug, Clone)]
pub struct StoreContext {
    failure: String,
    unique: Option<String>,
    foreign_key: Option<(StatusCode, String)>,
    not_found: Option<String>,
}

impl StoreContext {
    /// `failure` is the client message for anything unrecognized ("Failed to fetch X").
    pub fn new(failure: impl Into<String>) -> Self {
        Self {
            failure: failure.into(),
            unique: None,
            foreign_key: None,
            not_found: None,
        }
    }

    /// Message for unique violations; `{target}` is replaced by the column list.
    pub fn on_unique(mut self, message: impl Into<String>) -> Self {
        self.unique = Some(message.into());
        self
    }

    /// Referential-integrity violation reported as 409.
    pub fn on_foreign_key(mut self, message: impl Into<String>) -> Self {
        self.foreign_key = Some((StatusCode::CONFLICT, message.into()));
        self
    }

    /// Referential-integrity violation caused by a bad id in the request (400).
    pub fn on_invalid_reference(mut self, message: impl Into<String>) -> Self {
        self.foreign_key = Some((StatusCode::BAD_REQUEST, message.into()));
        self
    }

    pub fn on_not_found(mut self, message: impl Into<String>) -> Self {
        self.not_found = Some(message.into());
        self
    }

    pub fn translate(&self, err: DbErr) -> ServiceError {
        match classify_db_err(&err) {
            StoreErrorKind::UniqueViolation(target) => match &self.unique {
                Some(message) => ServiceError::Conflict(message.replace("{target}", &target)),
                None => self.unexpected(err),
            },
            StoreErrorKind::ForeignKeyViolation => match &self.foreign_key {
                Some((status, message)) if *status == StatusCode::BAD_REQUEST => {
                    ServiceError::BadRequest(message.clone())
                }
                Some((_, message)) => ServiceError::Conflict(message.clone()),
                None => self.unexpected(err),
            },
            StoreErrorKind::RecordNotFound => match &self.not_found {
                Some(message) => ServiceError::NotFound(message.clone()),
                None => self.unexpected(err),
            },
            StoreErrorKind::Other => self.unexpected(err),
        }
    }

    fn unexpected(&self, err: DbErr) -> ServiceError {
        ServiceError::DatabaseError {
            context: self.failure.clone(),
            source: err,
        }
    }
}

/// Shorthand for translating store results through a [`StoreContext`]
pub trait StoreResultExt<T> {
    fn map_store_err(self, ctx: &StoreContext) -> Result<T, ServiceError>;
}

impl<T> StoreResultExt<T> for Result<T, DbErr> {
    fn map_store_err(self, ctx: &StoreContext) -> Result<T, ServiceError> {
        self.map_err(|err| ctx.translate(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.message, "missing");
    }

    #[tokio::test]
    async fn dependents_error_carries_count_and_details() {
        let response = ServiceError::HasDependents {
            message: "Cannot delete supplier with existing products".into(),
            details: Some("This supplier has 2 associated products".into()),
            count: 2,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["dependentCount"], 2);
        assert_eq!(
            payload["details"],
            "This supplier has 2 associated products"
        );
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::from(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::HashError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::JwtError("key material".into()).response_message(),
            "Internal server error"
        );
        let db = StoreContext::new("Failed to fetch products")
            .translate(DbErr::Custom("relation does not exist".into()));
        assert_eq!(db.response_message(), "Failed to fetch products");
    }

    #[test]
    fn unique_target_parses_driver_messages() {
        assert_eq!(
            unique_target("UNIQUE constraint failed: products.sku"),
            "sku"
        );
        assert_eq!(
            unique_target(
                "UNIQUE constraint failed: inventory_items.product_id, inventory_items.batch_number"
            ),
            "product_id, batch_number"
        );
        assert_eq!(
            unique_target(
                "duplicate key value violates unique constraint \"products_sku_key\""
            ),
            "sku"
        );
        assert_eq!(unique_target("something else"), "fields");
    }

    #[test]
    fn record_not_found_maps_to_configured_message() {
        let ctx = StoreContext::new("Failed to update category").on_not_found("Category not found");
        assert_matches!(
            ctx.translate(DbErr::RecordNotUpdated),
            ServiceError::NotFound(message) if message == "Category not found"
        );
        assert_matches!(
            StoreContext::new("Failed to update category").translate(DbErr::RecordNotUpdated),
            ServiceError::DatabaseError { .. }
        );
    }
}
