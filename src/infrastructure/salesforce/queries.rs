//! SOQL text for the dashboard's bulk queries and the parsers for their rows.
//!
//! Every aggregate aliases its measure as `total` so one row shape covers
//! amounts and counts alike.

use super::SalesforceError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const CALL_TASK_TYPES: [&str; 3] = ["Call", "Outbound Call", "Inbound Call"];

pub fn closed_won_by_owner(stage: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT OwnerId, SUM(Amount) total
         FROM Opportunity
         WHERE StageName = '{}'
         AND CloseDate >= {} AND CloseDate <= {}
         GROUP BY OwnerId",
        escape(stage),
        start,
        end
    )
}

pub fn open_pipeline_by_owner(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT OwnerId, SUM(Amount) total
         FROM Opportunity
         WHERE IsClosed = false
         AND CloseDate >= {} AND CloseDate <= {}
         GROUP BY OwnerId",
        start, end
    )
}

pub fn sales_users(owner_ids: &[String], department: &str) -> String {
    format!(
        "SELECT Id, Name, Manager_Name__c, Department
         FROM User
         WHERE Id IN ({})
         AND IsActive = true
         AND Department = '{}'
         ORDER BY Name",
        id_list(owner_ids),
        escape(department)
    )
}

pub fn meetings_by_owner(
    owner_ids: &[String],
    keywords: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let subject_filter = if keywords.is_empty() {
        String::new()
    } else {
        let clauses = keywords
            .iter()
            .map(|k| format!("Subject LIKE '%{}%'", escape(k)))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("AND ({})", clauses)
    };

    format!(
        "SELECT OwnerId, COUNT(Id) total
         FROM Event
         WHERE OwnerId IN ({})
         AND ActivityDate >= {} AND ActivityDate <= {}
         AND IsRecurrence = false
         {}
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end,
        subject_filter
    )
}

pub fn email_tasks_by_owner(owner_ids: &[String], start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT OwnerId, COUNT(Id) total
         FROM Task
         WHERE OwnerId IN ({})
         AND ActivityDate >= {} AND ActivityDate <= {}
         AND Type = 'Email'
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end
    )
}

pub fn call_tasks_by_owner(owner_ids: &[String], start: NaiveDate, end: NaiveDate) -> String {
    let types = CALL_TASK_TYPES
        .iter()
        .map(|t| format!("Type = '{}'", t))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        "SELECT OwnerId, COUNT(Id) total
         FROM Task
         WHERE OwnerId IN ({})
         AND ActivityDate >= {} AND ActivityDate <= {}
         AND ({})
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end,
        types
    )
}

pub fn events_by_owner(owner_ids: &[String], start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT OwnerId, COUNT(Id) total
         FROM Event
         WHERE OwnerId IN ({})
         AND ActivityDate >= {} AND ActivityDate <= {}
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end
    )
}

pub fn forecast_by_owner(owner_ids: &[String], start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT OwnerId, SUM(ForecastAmount) total
         FROM ForecastingItem
         WHERE OwnerId IN ({})
         AND Period.StartDate >= {} AND Period.StartDate <= {}
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end
    )
}

pub fn quota_by_owner(owner_ids: &[String], start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT QuotaOwnerId, SUM(QuotaAmount) total
         FROM ForecastingQuota
         WHERE QuotaOwnerId IN ({})
         AND StartDate >= {} AND StartDate <= {}
         GROUP BY QuotaOwnerId",
        id_list(owner_ids),
        start,
        end
    )
}

/// All opportunities, open or closed, closing in the window.
pub fn historic_pipeline_by_owner(owner_ids: &[String], start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT OwnerId, SUM(Amount) total
         FROM Opportunity
         WHERE OwnerId IN ({})
         AND CloseDate >= {} AND CloseDate <= {}
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end
    )
}

pub fn historic_closed_won_by_owner(
    owner_ids: &[String],
    stage: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    format!(
        "SELECT OwnerId, SUM(Amount) total
         FROM Opportunity
         WHERE OwnerId IN ({})
         AND CloseDate >= {} AND CloseDate <= {}
         AND StageName = '{}'
         GROUP BY OwnerId",
        id_list(owner_ids),
        start,
        end,
        escape(stage)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRow {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Manager_Name__c", default)]
    pub manager_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerAmountRow {
    #[serde(rename = "OwnerId", alias = "QuotaOwnerId")]
    owner_id: String,
    total: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct OwnerCountRow {
    #[serde(rename = "OwnerId")]
    owner_id: String,
    total: Option<u64>,
}

pub fn parse_users(records: Vec<Value>) -> Result<Vec<UserRow>, SalesforceError> {
    records.into_iter().map(parse_row).collect()
}

/// Null sums (owners whose opportunities have no amount) count as zero.
pub fn parse_amounts(records: Vec<Value>) -> Result<HashMap<String, Decimal>, SalesforceError> {
    let mut amounts = HashMap::new();
    for record in records {
        let row: OwnerAmountRow = parse_row(record)?;
        *amounts.entry(row.owner_id).or_insert(Decimal::ZERO) += row.total.unwrap_or_default();
    }
    Ok(amounts)
}

pub fn parse_counts(records: Vec<Value>) -> Result<HashMap<String, u64>, SalesforceError> {
    let mut counts = HashMap::new();
    for record in records {
        let row: OwnerCountRow = parse_row(record)?;
        *counts.entry(row.owner_id).or_insert(0) += row.total.unwrap_or_default();
    }
    Ok(counts)
}

fn parse_row<T: serde::de::DeserializeOwned>(record: Value) -> Result<T, SalesforceError> {
    serde_json::from_value(record).map_err(|e| SalesforceError::InvalidResponse(e.to_string()))
}

fn id_list(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("'{}'", escape(id)))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
