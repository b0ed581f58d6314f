use crate::domain::oauth::OAuthError;
use crate::error::AppError;
use crate::infrastructure::salesforce::SalesforceError;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Salesforce is not connected")]
    NotConnected { oauth_available: bool },
    #[error("Salesforce connection lost: {0}")]
    Reconnect(String),
    #[error("Salesforce login failed: {0}")]
    Login(#[from] SalesforceError),
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<OAuthError> for ConnectionError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::NotConnected => ConnectionError::NotConnected { oauth_available: true },
            OAuthError::Rejected(reason) | OAuthError::Denied(reason) => ConnectionError::Reconnect(reason),
            OAuthError::StateMismatch => ConnectionError::Reconnect("state mismatch".to_string()),
            OAuthError::Dependency(msg) => ConnectionError::Dependency(msg),
            OAuthError::Storage(e) => ConnectionError::Internal(e.to_string()),
        }
    }
}

impl From<ConnectionError> for AppError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotConnected { oauth_available } => {
                AppError::SalesforceNotConnected { oauth_available }
            }
            ConnectionError::Reconnect(_) => {
                AppError::Unauthorized("Salesforce session expired".to_string())
            }
            ConnectionError::Login(e) => AppError::ExternalService(e.to_string()),
            ConnectionError::Dependency(msg) => AppError::ExternalService(msg),
            ConnectionError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
