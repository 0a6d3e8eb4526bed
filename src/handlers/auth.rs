use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::models::{Requester, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
}

/// The auth gateway in front of this service forwards the caller's identity as headers.
#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(&parts.headers, USER_ID_HEADER);
        if user_id.is_empty() {
            return Err(AppError::Unauthorized);
        }
        let role = Role::parse(header(&parts.headers, USER_ROLE_HEADER))
            .ok_or(AppError::Unauthorized)?;

        Ok(Requester {
            user_id: user_id.to_string(),
            role,
        })
    }
}
