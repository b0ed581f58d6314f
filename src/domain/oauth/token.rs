use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens as returned by a provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires. Providers that do not report a
    /// lifetime get their configured default filled in by the client.
    pub expires_in: i64,
    pub instance_url: Option<String>,
}

/// Persisted credentials for one application key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub app_key: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

impl TokenRecord {
    pub fn from_grant(app_key: &str, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            app_key: app_key.to_string(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or_default(),
            expires_at: now + Duration::seconds(grant.expires_in),
            instance_url: grant.instance_url,
        }
    }

    /// Apply a refresh response. A missing or empty refresh token in the
    /// response keeps the stored one.
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let refresh_token = match grant.refresh_token {
            Some(rotated) if !rotated.is_empty() => rotated,
            _ => self.refresh_token.clone(),
        };

        Self {
            app_key: self.app_key.clone(),
            access_token: grant.access_token,
            refresh_token,
            expires_at: now + Duration::seconds(grant.expires_in),
            instance_url: grant.instance_url.or_else(|| self.instance_url.clone()),
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// True when the access token expires within `skew` of `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at - now <= skew
    }
}
