//! Caller identity seam. Sign-in lives with the external auth provider; requests reach this
//! service with an identity already established upstream.

use axum::http::HeaderMap;

use super::domain::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";

pub trait SessionVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap) -> Result<UserId, AuthError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no authenticated session")]
    Missing,
    #[error("malformed identity header")]
    Malformed,
}

/// Trusts the user id injected by the gateway in front of this service.
#[derive(Debug, Clone)]
pub struct TrustedHeaderVerifier {
    header: String,
}

impl Default for TrustedHeaderVerifier {
    fn default() -> Self {
        Self::new(USER_ID_HEADER)
    }
}

impl TrustedHeaderVerifier {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl SessionVerifier for TrustedHeaderVerifier {
    fn verify(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let value = headers.get(self.header.as_str()).ok_or(AuthError::Missing)?;
        let user = value.to_str().map_err(|_| AuthError::Malformed)?.trim();
        if user.is_empty() {
            return Err(AuthError::Missing);
        }
        Ok(UserId(user.to_string()))
    }
}
