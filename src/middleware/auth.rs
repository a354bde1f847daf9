//! API key extraction middleware.
//!
//! Device-facing routes expect the key token in the `X-API-Key` header; the
//! JSON body carries only device data. This middleware pulls the token out of
//! the header and stashes it in the request's extension map for handlers to
//! consume.
//!
//! Note that it deliberately does NOT validate the key against the database:
//! the acceptance rules differ per operation (a heartbeat from a registered
//! device must succeed even when the key is over quota or expired), so each
//! workflow operation resolves and judges the key itself. The middleware only
//! guarantees a token string is present.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

/// Header carrying the API key token.
const API_KEY_HEADER: &str = "x-api-key";

/// Raw token as presented by the device, attached to authenticated requests.
///
/// Handlers extract this with `Extension<ApiKeyToken>`.
#[derive(Debug, Clone)]
pub struct ApiKeyToken(pub String);

/// Pull the token out of the `X-API-Key` header.
///
/// No normalization: the stored token is matched case and whitespace
/// sensitively, so the header value is taken verbatim.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingApiKey)
}

/// API key extraction middleware function.
///
/// # Flow
///
/// 1. Read the `X-API-Key` header from the request
/// 2. If present: insert [`ApiKeyToken`] into request extensions, call next
/// 3. If absent: return 401 Unauthorized
pub async fn require_api_key(mut request: Request, next: Next) -> Result<Response, AppError> {
    let token = extract_token(request.headers())?.to_string();

    request.extensions_mut().insert(ApiKeyToken(token));

    Ok(next.run(request).await)
}
