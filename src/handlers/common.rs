use crate::db::PageRequest;
use crate::errors::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::str::FromStr;
use utoipa::IntoParams;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// JSON body extractor whose rejections become 400 error bodies
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Query string extractor whose rejections become 400 error bodies
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Parses a numeric path id, failing with "Invalid <resource> ID".
pub fn parse_id(raw: &str, resource: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} ID", resource)))
}

/// Page/limit pair shared by every list query
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    /// Page size, capped by `api_max_page_size`
    #[param(value_type = Option<u64>)]
    pub limit: Option<String>,
}

impl PaginationParams {
    pub fn page_request(&self, default_limit: u64, max_limit: u32) -> PageRequest {
        PageRequest::new(
            parse_opt(self.page.as_deref()),
            parse_opt(self.limit.as_deref()),
            default_limit,
            max_limit as u64,
        )
    }
}

/// Parses an optional query value; blank or malformed input is treated as absent.
pub fn parse_opt<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

/// `true` only for the literal `true`
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_query_helpers() {
        assert_eq!(parse_id("42", "product").unwrap(), 42);
        assert!(parse_id("abc", "product").is_err());
        assert_eq!(parse_opt::<i64>(Some("x")), None);
        assert_eq!(parse_opt::<i64>(Some(" 7 ")), Some(7));
        assert_eq!(parse_opt::<i64>(Some("")), None);
        assert!(parse_flag(Some("true")));
        assert!(!parse_flag(Some("1")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn pagination_params_use_defaults_for_garbage() {
        let params = PaginationParams {
            page: Some("two".into()),
            limit: Some("500".into()),
        };
        assert_eq!(params.page_request(20, 100), PageRequest { page: 1, limit: 100 });
    }
}
