pub mod client;
pub mod presets;

pub use client::{OAuthClient, ProviderConfig};

use crate::domain::oauth::{Identity, TokenGrant};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The grant itself is dead, e.g. `invalid_grant` for a revoked refresh
    /// token, or the identity endpoint refused the access token.
    #[error("rejected by provider: {0}")]
    Rejected(String),
    /// Network errors, 5xx, throttling and other failures that say nothing
    /// about the stored tokens.
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Authorization-code OAuth2 provider.
///
/// Salesforce and Azure AD are the same implementation with different
/// endpoint configurations; tests substitute fakes.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Short provider name used in logs and messages.
    fn name(&self) -> &str;

    fn authorization_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError>;

    async fn fetch_identity(&self, grant: &TokenGrant) -> Result<Identity, ProviderError>;

    /// Whether a failed identity lookup fails the whole sign-in.
    fn identity_required(&self) -> bool;
}
