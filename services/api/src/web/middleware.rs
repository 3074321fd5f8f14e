//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Header carrying the identity provider's stable uid.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Optional header carrying the user's display name, used by the assistant.
pub const DISPLAY_NAME_HEADER: &str = "x-user-name";

/// The authenticated caller, inserted into request extensions by `require_user`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware that extracts the caller's uid from the `x-user-id` header.
///
/// Sign-in happens at the identity provider; this layer only requires that a
/// non-blank uid is present. Missing or blank values return 401 Unauthorized.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            warn!("Request to {} without a user id", req.uri().path());
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(UserId(user_id));
    Ok(next.run(req).await)
}
