use super::calculations::{build_report, coverage_ratio};
use super::error::DashboardServiceError;
use super::filter::RowFilter;
use super::model::{CalculationSettings, DashboardReport, RawDashboardData, SalesRep};
use super::period::ReportingPeriod;
use crate::domain::access::AccessGrant;
use crate::infrastructure::salesforce::queries;
use crate::infrastructure::salesforce::{SalesforceConnection, SalesforceError, SoqlExecutor};
use async_trait::async_trait;
use moka::future::Cache;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_CACHED_PERIODS: u64 = 64;

/// Org-specific values baked into the queries.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub closed_won_stage: String,
    pub sales_department: String,
    pub meeting_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub report: DashboardReport,
    pub from_cache: bool,
    pub elapsed: Duration,
}

type CacheKey = (String, ReportingPeriod);

pub struct DashboardService {
    executor: Arc<dyn SoqlExecutor>,
    queries: QuerySettings,
    cache: Option<Cache<CacheKey, Arc<RawDashboardData>>>,
}

impl DashboardService {
    /// A zero `cache_ttl` disables caching.
    pub fn new(executor: Arc<dyn SoqlExecutor>, queries: QuerySettings, cache_ttl: Duration) -> Self {
        let cache = if cache_ttl.is_zero() {
            None
        } else {
            Some(
                Cache::builder()
                    .max_capacity(MAX_CACHED_PERIODS)
                    .time_to_live(cache_ttl)
                    .build(),
            )
        };

        Self {
            executor,
            queries,
            cache,
        }
    }
}

#[async_trait]
pub trait DashboardServiceApi: Send + Sync {
    /// Load the report for a period.
    ///
    /// Raw query results are cached per (instance, period), so changing only
    /// the calculation settings or filters recomputes without new queries.
    /// Requires an [`AccessGrant`], so a denied access check never reaches
    /// Salesforce.
    async fn load_report(
        &self,
        grant: &AccessGrant,
        connection: &SalesforceConnection,
        period: ReportingPeriod,
        settings: &CalculationSettings,
        filter: &RowFilter,
    ) -> Result<LoadedReport, DashboardServiceError>;

    async fn invalidate_cache(&self);
}

#[async_trait]
impl DashboardServiceApi for DashboardService {
    async fn load_report(
        &self,
        grant: &AccessGrant,
        connection: &SalesforceConnection,
        period: ReportingPeriod,
        settings: &CalculationSettings,
        filter: &RowFilter,
    ) -> Result<LoadedReport, DashboardServiceError> {
        let started = Instant::now();
        let key = (connection.instance_url.clone(), period);

        let cached = match &self.cache {
            Some(cache) => cache.get(&key).await,
            None => None,
        };
        let from_cache = cached.is_some();

        let raw = match cached {
            Some(raw) => raw,
            None => {
                tracing::info!(
                    period = %period.label(),
                    user = grant.identity().map(|i| i.email.as_str()).unwrap_or("-"),
                    "Fetching dashboard data from Salesforce"
                );
                let raw = Arc::new(self.fetch(connection, period).await?);
                if let Some(cache) = &self.cache {
                    cache.insert(key, raw.clone()).await;
                }
                raw
            }
        };

        let report = build_report(period, &raw, settings, filter);
        let elapsed = started.elapsed();
        tracing::debug!(
            rows = report.rows.len(),
            from_cache,
            elapsed_ms = elapsed.as_millis() as u64,
            "Dashboard report built"
        );

        Ok(LoadedReport {
            report,
            from_cache,
            elapsed,
        })
    }

    async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}

impl DashboardService {
    async fn fetch(
        &self,
        connection: &SalesforceConnection,
        period: ReportingPeriod,
    ) -> Result<RawDashboardData, DashboardServiceError> {
        let (start, end) = period.date_range();
        let mut raw = RawDashboardData::default();

        raw.closed_won = queries::parse_amounts(
            self.required(
                connection,
                &queries::closed_won_by_owner(&self.queries.closed_won_stage, start, end),
            )
            .await?,
        )?;
        raw.open_pipeline = queries::parse_amounts(
            self.required(connection, &queries::open_pipeline_by_owner(start, end))
                .await?,
        )?;

        let owner_ids: Vec<String> = raw
            .closed_won
            .keys()
            .chain(raw.open_pipeline.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if owner_ids.is_empty() {
            return Ok(raw);
        }

        let users = queries::parse_users(
            self.required(
                connection,
                &queries::sales_users(&owner_ids, &self.queries.sales_department),
            )
            .await?,
        )?;
        raw.reps = users
            .into_iter()
            .map(|u| SalesRep {
                id: u.id,
                name: u.name,
                manager_name: u.manager_name.filter(|m| !m.trim().is_empty()),
            })
            .collect();

        let rep_ids: Vec<String> = raw.reps.iter().map(|r| r.id.clone()).collect();
        if rep_ids.is_empty() {
            return Ok(raw);
        }

        raw.meetings = queries::parse_counts(
            self.required(
                connection,
                &queries::meetings_by_owner(&rep_ids, &self.queries.meeting_keywords, start, end),
            )
            .await?,
        )?;

        let mut warnings = Vec::new();

        raw.email_activity = self
            .optional_counts(
                connection,
                "Email activity",
                &queries::email_tasks_by_owner(&rep_ids, start, end),
                &mut warnings,
            )
            .await?;

        let calls = self
            .optional_counts(
                connection,
                "Call activity",
                &queries::call_tasks_by_owner(&rep_ids, start, end),
                &mut warnings,
            )
            .await?;
        let events = self
            .optional_counts(
                connection,
                "Event activity",
                &queries::events_by_owner(&rep_ids, start, end),
                &mut warnings,
            )
            .await?;
        raw.phone_activity = merge_counts(calls, events);

        raw.forecast = self
            .optional_amounts(
                connection,
                "Forecast (ForecastingItem)",
                &queries::forecast_by_owner(&rep_ids, start, end),
                &mut warnings,
            )
            .await?;
        raw.quota = self
            .optional_amounts(
                connection,
                "Quota (ForecastingQuota)",
                &queries::quota_by_owner(&rep_ids, start, end),
                &mut warnings,
            )
            .await?;

        let (history_start, history_end) = period.history_range();
        let historic_pipeline = self
            .optional_amounts(
                connection,
                "Historic pipeline",
                &queries::historic_pipeline_by_owner(&rep_ids, history_start, history_end),
                &mut warnings,
            )
            .await?;
        let historic_closed_won = self
            .optional_amounts(
                connection,
                "Historic closed won",
                &queries::historic_closed_won_by_owner(
                    &rep_ids,
                    &self.queries.closed_won_stage,
                    history_start,
                    history_end,
                ),
                &mut warnings,
            )
            .await?;
        raw.coverage_ratios = historic_pipeline
            .iter()
            .filter_map(|(owner, pipeline)| {
                let won = historic_closed_won.get(owner).copied().unwrap_or_default();
                coverage_ratio(*pipeline, won).map(|ratio| (owner.clone(), ratio))
            })
            .collect();

        raw.warnings = warnings;
        Ok(raw)
    }

    async fn required(
        &self,
        connection: &SalesforceConnection,
        soql: &str,
    ) -> Result<Vec<serde_json::Value>, DashboardServiceError> {
        Ok(self.executor.query(connection, soql).await?)
    }

    /// Session errors still propagate; anything else becomes a warning.
    async fn optional(
        &self,
        connection: &SalesforceConnection,
        label: &str,
        soql: &str,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<serde_json::Value>, DashboardServiceError> {
        match self.executor.query(connection, soql).await {
            Ok(records) => Ok(records),
            Err(SalesforceError::SessionExpired) => Err(DashboardServiceError::SessionExpired),
            Err(err) => {
                tracing::warn!(query = %label, error = %err, "Optional query failed");
                warnings.push(format!("{} unavailable: {}", label, err));
                Ok(Vec::new())
            }
        }
    }

    async fn optional_counts(
        &self,
        connection: &SalesforceConnection,
        label: &str,
        soql: &str,
        warnings: &mut Vec<String>,
    ) -> Result<HashMap<String, u64>, DashboardServiceError> {
        let records = self.optional(connection, label, soql, warnings).await?;
        match queries::parse_counts(records) {
            Ok(counts) => Ok(counts),
            Err(err) => {
                warnings.push(format!("{} unavailable: {}", label, err));
                Ok(HashMap::new())
            }
        }
    }

    async fn optional_amounts(
        &self,
        connection: &SalesforceConnection,
        label: &str,
        soql: &str,
        warnings: &mut Vec<String>,
    ) -> Result<HashMap<String, Decimal>, DashboardServiceError> {
        let records = self.optional(connection, label, soql, warnings).await?;
        match queries::parse_amounts(records) {
            Ok(amounts) => Ok(amounts),
            Err(err) => {
                warnings.push(format!("{} unavailable: {}", label, err));
                Ok(HashMap::new())
            }
        }
    }
}

fn merge_counts(mut left: HashMap<String, u64>, right: HashMap<String, u64>) -> HashMap<String, u64> {
    for (owner, count) in right {
        *left.entry(owner).or_insert(0) += count;
    }
    left
}
