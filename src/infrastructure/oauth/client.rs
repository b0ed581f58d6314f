use super::{OAuthProvider, ProviderError};
use crate::domain::oauth::{Identity, TokenGrant};
use async_trait::async_trait;
use serde::Deserialize;

/// Endpoints and credentials for one OAuth2 provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Endpoint returning the signed-in user. `None` skips the lookup.
    pub identity_url: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub extra_authorize_params: Vec<(String, String)>,
    /// Azure AD wants `scope` repeated on code and refresh grants.
    pub scope_on_token_requests: bool,
    /// Used when the token response carries no `expires_in`.
    pub default_token_lifetime_secs: i64,
    pub identity_required: bool,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    instance_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointError {
    error: Option<String>,
    error_description: Option<String>,
}

/// OAuth error codes meaning the grant itself is dead. Anything else
/// (throttling, bad client credentials) leaves stored tokens usable.
const REJECTED_GRANT_ERRORS: [&str; 2] = ["invalid_grant", "invalid_token"];

/// Union of the Salesforce `userinfo` and Microsoft Graph `/me` shapes.
#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(alias = "displayName", alias = "display_name")]
    name: Option<String>,
    #[serde(alias = "mail")]
    email: Option<String>,
    #[serde(alias = "userPrincipalName", alias = "preferred_username")]
    username: Option<String>,
}

pub struct OAuthClient {
    config: ProviderConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn scope_param(&self) -> String {
        self.config.scopes.join(" ")
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, ProviderError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("{} token endpoint: {}", self.config.name, e)))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(token_error(&body, status.as_u16()));
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "{} token endpoint returned {}",
                self.config.name, status
            )));
        }

        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("token response: {}", e)))?;

        Ok(TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token.filter(|t| !t.is_empty()),
            expires_in: body
                .expires_in
                .unwrap_or(self.config.default_token_lifetime_secs),
            instance_url: body.instance_url,
        })
    }
}

#[async_trait]
impl OAuthProvider for OAuthClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn authorization_url(&self, state: &str) -> String {
        let mut params: Vec<(&str, String)> = vec![
            ("response_type", "code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("scope", self.scope_param()),
            ("state", state.to_string()),
        ];
        for (key, value) in &self.config.extra_authorize_params {
            params.push((key.as_str(), value.clone()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.authorize_url, query)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        let scope = self.scope_param();
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if self.config.scope_on_token_requests {
            params.push(("scope", scope.as_str()));
        }

        let grant = self.token_request(&params).await?;
        tracing::info!(provider = %self.config.name, "Authorization code exchanged");
        Ok(grant)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        let scope = self.scope_param();
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if self.config.scope_on_token_requests {
            params.push(("scope", scope.as_str()));
        }

        let grant = self.token_request(&params).await?;
        tracing::debug!(provider = %self.config.name, "Access token refreshed");
        Ok(grant)
    }

    async fn fetch_identity(&self, grant: &TokenGrant) -> Result<Identity, ProviderError> {
        let Some(url) = self.config.identity_url.as_deref() else {
            return Err(ProviderError::InvalidResponse(format!(
                "{} has no identity endpoint",
                self.config.name
            )));
        };

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&grant.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("identity endpoint: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(ProviderError::Rejected(format!(
                "identity endpoint returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "identity endpoint returned {}",
                status
            )));
        }

        let body: IdentityResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("identity response: {}", e)))?;

        let email = body
            .email
            .filter(|e| !e.is_empty())
            .or(body.username)
            .ok_or_else(|| ProviderError::InvalidResponse("identity has no email".to_string()))?;
        let display_name = body
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.clone());

        Ok(Identity::new(display_name, email))
    }

    fn identity_required(&self) -> bool {
        self.config.identity_required
    }
}

fn token_error(body: &str, status: u16) -> ProviderError {
    match serde_json::from_str::<TokenEndpointError>(body) {
        Ok(TokenEndpointError {
            error: Some(code),
            error_description,
        }) => {
            let rejected = REJECTED_GRANT_ERRORS.contains(&code.as_str());
            let message = match error_description {
                Some(description) => format!("{}: {}", code, description),
                None => code,
            };
            if rejected {
                ProviderError::Rejected(message)
            } else {
                ProviderError::Transport(message)
            }
        }
        _ => ProviderError::Transport(format!("token endpoint returned {}", status)),
    }
}
