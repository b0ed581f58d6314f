use super::{SalesforceConnection, SalesforceError, SoqlExecutor};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    #[serde(default)]
    records: Vec<Value>,
    #[serde(default)]
    next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

pub struct SalesforceRestClient {
    api_version: String,
    http_client: reqwest::Client,
}

impl SalesforceRestClient {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn query_url(&self, connection: &SalesforceConnection, soql: &str) -> String {
        format!(
            "{}/services/data/v{}/query?q={}",
            connection.instance_url.trim_end_matches('/'),
            self.api_version,
            urlencoding::encode(soql)
        )
    }

    async fn fetch_page(
        &self,
        connection: &SalesforceConnection,
        url: &str,
    ) -> Result<QueryPage, SalesforceError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&connection.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SalesforceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<QueryPage>()
                .await
                .map_err(|e| SalesforceError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}

#[async_trait]
impl SoqlExecutor for SalesforceRestClient {
    async fn query(
        &self,
        connection: &SalesforceConnection,
        soql: &str,
    ) -> Result<Vec<Value>, SalesforceError> {
        let soql = compact(soql);
        tracing::debug!(soql = %soql, "Running SOQL query");

        let mut page = self
            .fetch_page(connection, &self.query_url(connection, &soql))
            .await?;
        let mut records = std::mem::take(&mut page.records);

        while let Some(next) = page.next_records_url.take() {
            let url = format!("{}{}", connection.instance_url.trim_end_matches('/'), next);
            page = self.fetch_page(connection, &url).await?;
            records.append(&mut page.records);
        }

        for record in &mut records {
            if let Some(map) = record.as_object_mut() {
                map.remove("attributes");
            }
        }

        Ok(records)
    }
}

fn classify_error(status: StatusCode, body: &str) -> SalesforceError {
    let first = serde_json::from_str::<Vec<ApiError>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next());

    if status == StatusCode::UNAUTHORIZED
        || first.as_ref().is_some_and(|e| e.error_code == "INVALID_SESSION_ID")
    {
        return SalesforceError::SessionExpired;
    }

    match first {
        Some(error) => SalesforceError::Rejected {
            code: error.error_code,
            message: error.message,
        },
        None if status.is_server_error() => {
            SalesforceError::Transport(format!("Salesforce returned {}", status))
        }
        None => SalesforceError::Rejected {
            code: status.as_u16().to_string(),
            message: body.chars().take(200).collect(),
        },
    }
}

/// Collapse the multi-line query builders' output into one line.
fn compact(soql: &str) -> String {
    soql.split_whitespace().collect::<Vec<_>>().join(" ")
}
