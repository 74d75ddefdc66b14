use crate::tracing::{scope_request_id, RequestId, REQUEST_ID_HEADER};
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};

const HEADER: HeaderName = HeaderName::from_static(REQUEST_ID_HEADER);

/// Reuses a well-formed client `x-request-id` or mints a fresh one, then
/// exposes it to handlers and echoes it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = incoming_id(request.headers()).unwrap_or_default();
    let echoed = HeaderValue::from_str(request_id.as_str()).ok();

    if let Some(value) = &echoed {
        request.headers_mut().insert(HEADER, value.clone());
    }
    request.extensions_mut().insert(request_id.clone());

    let mut response = scope_request_id(request_id, next.run(request)).await;
    if let Some(value) = echoed {
        response.headers_mut().insert(HEADER, value);
    }
    response
}

fn incoming_id(headers: &HeaderMap) -> Option<RequestId> {
    headers
        .get(&HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::from_header)
}
