pub mod queries;
pub mod rest_client;
pub mod soap_login;

pub use rest_client::SalesforceRestClient;
pub use soap_login::SoapPasswordLogin;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum SalesforceError {
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
    #[error("Salesforce session expired or invalid")]
    SessionExpired,
    #[error("Salesforce login failed: {0}")]
    LoginFailed(String),
    #[error("Salesforce unreachable: {0}")]
    Transport(String),
    #[error("unexpected Salesforce response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionSource {
    #[serde(rename = "oauth")]
    OAuth,
    Password,
}

/// Everything needed to call the REST API on behalf of one session.
#[derive(Debug, Clone)]
pub struct SalesforceConnection {
    pub instance_url: String,
    pub access_token: String,
    pub source: ConnectionSource,
}

/// Runs a SOQL query and returns every record, following pagination.
/// Records come back without their `attributes` metadata.
#[async_trait]
pub trait SoqlExecutor: Send + Sync {
    async fn query(
        &self,
        connection: &SalesforceConnection,
        soql: &str,
    ) -> Result<Vec<serde_json::Value>, SalesforceError>;
}

/// Username/password/security-token login.
#[async_trait]
pub trait PasswordLogin: Send + Sync {
    async fn login(&self) -> Result<SalesforceConnection, SalesforceError>;
}
