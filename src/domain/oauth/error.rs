use crate::error::AppError;
use crate::infrastructure::oauth::ProviderError;
use crate::infrastructure::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("OAuth state did not match the pending sign-in")]
    StateMismatch,
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("refresh token rejected: {0}")]
    Rejected(String),
    #[error("not connected")]
    NotConnected,
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("token storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl From<ProviderError> for OAuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(msg) => OAuthError::Rejected(msg),
            other => OAuthError::Dependency(other.to_string()),
        }
    }
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::StateMismatch => {
                AppError::Unauthorized("Sign-in request could not be verified".to_string())
            }
            OAuthError::Denied(msg) => AppError::Unauthorized(format!("Authorization denied ({})", msg)),
            OAuthError::Rejected(_) => AppError::Unauthorized("Your session has expired".to_string()),
            OAuthError::NotConnected => AppError::Unauthorized("Not connected".to_string()),
            OAuthError::Dependency(msg) => AppError::ExternalService(msg),
            OAuthError::Storage(e) => AppError::Internal(e.to_string()),
        }
    }
}
