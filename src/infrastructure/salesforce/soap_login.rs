use super::{ConnectionSource, PasswordLogin, SalesforceConnection, SalesforceError};
use crate::infrastructure::config::PasswordCredentials;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static SERVER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<serverUrl>\s*(https?://[^/<]+)").expect("valid serverUrl pattern"));
static SESSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<sessionId>([^<]+)</sessionId>").expect("valid sessionId pattern"));
static FAULT_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<faultstring>([^<]*)</faultstring>").expect("valid faultstring pattern"));

/// Partner API `login` call, the fallback when no OAuth connection exists.
pub struct SoapPasswordLogin {
    login_url: String,
    api_version: String,
    credentials: PasswordCredentials,
    http_client: reqwest::Client,
}

impl SoapPasswordLogin {
    pub fn new(
        login_url: impl Into<String>,
        api_version: impl Into<String>,
        credentials: PasswordCredentials,
    ) -> Self {
        Self {
            login_url: login_url.into(),
            api_version: api_version.into(),
            credentials,
            http_client: reqwest::Client::new(),
        }
    }

    fn envelope(&self) -> String {
        // Salesforce expects the security token appended to the password.
        let secret = format!(
            "{}{}",
            self.credentials.password, self.credentials.security_token
        );
        format!(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
            xml_escape(&self.credentials.username),
            xml_escape(&secret)
        )
    }
}

#[async_trait]
impl PasswordLogin for SoapPasswordLogin {
    async fn login(&self) -> Result<SalesforceConnection, SalesforceError> {
        let url = format!("{}/services/Soap/u/{}", self.login_url, self.api_version);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(self.envelope())
            .send()
            .await
            .map_err(|e| SalesforceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SalesforceError::Transport(e.to_string()))?;

        if let Some(fault) = FAULT_STRING.captures(&body) {
            return Err(SalesforceError::LoginFailed(fault[1].to_string()));
        }
        if !status.is_success() {
            return Err(SalesforceError::LoginFailed(format!("login returned {}", status)));
        }

        let instance_url = SERVER_URL
            .captures(&body)
            .map(|c| c[1].to_string())
            .ok_or_else(|| SalesforceError::InvalidResponse("login response has no serverUrl".to_string()))?;
        let access_token = SESSION_ID
            .captures(&body)
            .map(|c| c[1].to_string())
            .ok_or_else(|| SalesforceError::InvalidResponse("login response has no sessionId".to_string()))?;

        tracing::info!(
            username = %self.credentials.username,
            instance_url = %instance_url,
            "Salesforce password login succeeded"
        );

        Ok(SalesforceConnection {
            instance_url,
            access_token,
            source: ConnectionSource::Password,
        })
    }
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
