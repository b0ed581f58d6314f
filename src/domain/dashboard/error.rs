use crate::error::AppError;
use crate::infrastructure::salesforce::SalesforceError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardServiceError {
    #[error("query failed: {0}")]
    Query(String),
    #[error("Salesforce session expired")]
    SessionExpired,
    #[error("dependency error: {0}")]
    Dependency(String),
}

impl From<SalesforceError> for DashboardServiceError {
    fn from(err: SalesforceError) -> Self {
        match err {
            SalesforceError::SessionExpired => DashboardServiceError::SessionExpired,
            SalesforceError::Rejected { .. } | SalesforceError::InvalidResponse(_) => {
                DashboardServiceError::Query(err.to_string())
            }
            SalesforceError::LoginFailed(_) | SalesforceError::Transport(_) => {
                DashboardServiceError::Dependency(err.to_string())
            }
        }
    }
}

impl From<DashboardServiceError> for AppError {
    fn from(err: DashboardServiceError) -> Self {
        match err {
            DashboardServiceError::Query(msg) => AppError::Query(msg),
            DashboardServiceError::SessionExpired => {
                AppError::Unauthorized("Salesforce session expired".to_string())
            }
            DashboardServiceError::Dependency(msg) => AppError::ExternalService(msg),
        }
    }
}
