use super::ProviderConfig;
use crate::infrastructure::config::{AzureConfig, SalesforceConfig};

/// Scopes Azure AD needs for an id token and a refresh token.
const AZURE_RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Azure AD access tokens default to one hour.
const AZURE_TOKEN_LIFETIME_SECS: i64 = 3600;

impl ProviderConfig {
    /// Salesforce web-server flow. `None` when no connected app is configured.
    pub fn salesforce(config: &SalesforceConfig) -> Option<Self> {
        let client_id = config.client_id.clone()?;
        let client_secret = config.client_secret.clone()?;
        let base = config.login_url.as_str();

        Some(ProviderConfig {
            name: "salesforce".to_string(),
            authorize_url: format!("{}/services/oauth2/authorize", base),
            token_url: format!("{}/services/oauth2/token", base),
            identity_url: Some(format!("{}/services/oauth2/userinfo", base)),
            client_id,
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            extra_authorize_params: vec![("prompt".to_string(), "login".to_string())],
            scope_on_token_requests: false,
            default_token_lifetime_secs: config.token_lifetime_secs,
            identity_required: false,
        })
    }

    pub fn azure_ad(config: &AzureConfig) -> Self {
        let mut scopes = config.scopes.clone();
        for reserved in AZURE_RESERVED_SCOPES {
            if !scopes.iter().any(|s| s.eq_ignore_ascii_case(reserved)) {
                scopes.push(reserved.to_string());
            }
        }

        ProviderConfig {
            name: "azure_ad".to_string(),
            authorize_url: format!("{}/oauth2/v2.0/authorize", config.authority),
            token_url: format!("{}/oauth2/v2.0/token", config.authority),
            identity_url: Some(format!("{}/me", config.graph_url)),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes,
            extra_authorize_params: vec![("response_mode".to_string(), "query".to_string())],
            scope_on_token_requests: true,
            default_token_lifetime_secs: AZURE_TOKEN_LIFETIME_SECS,
            identity_required: true,
        }
    }
}
