use super::period::ReportingPeriod;
use crate::infrastructure::config::DashboardConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRep {
    pub id: String,
    pub name: String,
    pub manager_name: Option<String>,
}

/// Query results for one period, keyed by owner id.
#[derive(Debug, Clone, Default)]
pub struct RawDashboardData {
    pub reps: Vec<SalesRep>,
    pub closed_won: HashMap<String, Decimal>,
    pub open_pipeline: HashMap<String, Decimal>,
    pub meetings: HashMap<String, u64>,
    pub email_activity: HashMap<String, u64>,
    pub phone_activity: HashMap<String, u64>,
    pub forecast: HashMap<String, Decimal>,
    pub quota: HashMap<String, Decimal>,
    /// Only owners with both historic pipeline and closed-won have an entry.
    pub coverage_ratios: HashMap<String, Decimal>,
    /// Optional queries that failed, shown next to the report.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    AllowNegative,
    ClampAtZero,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CalculationSettings {
    pub avg_deal_size: Decimal,
    pub win_rate: Decimal,
    /// Used for reps without six months of history.
    pub default_coverage_ratio: Decimal,
    pub remainder_policy: RemainderPolicy,
}

impl CalculationSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            avg_deal_size: config.avg_deal_size,
            win_rate: config.win_rate,
            default_coverage_ratio: config.default_coverage_ratio,
            remainder_policy: if config.clamp_remaining {
                RemainderPolicy::ClampAtZero
            } else {
                RemainderPolicy::AllowNegative
            },
        }
    }
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            avg_deal_size: Decimal::new(5000, 0),
            win_rate: Decimal::new(20, 2),
            default_coverage_ratio: Decimal::new(5, 0),
            remainder_policy: RemainderPolicy::AllowNegative,
        }
    }
}

/// One salesperson's metrics for the selected month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaRow {
    pub owner_id: String,
    pub name: String,
    pub manager_name: Option<String>,
    pub monthly_quota: Decimal,
    pub forecast_amount: Decimal,
    pub percent_to_quota: Decimal,
    pub closed_won: Decimal,
    pub remaining_quota: Decimal,
    /// `None` when the rep has no usable history; the default ratio was applied.
    pub pipeline_coverage_ratio: Option<Decimal>,
    pub pipeline_should_have: Decimal,
    pub open_pipeline: Decimal,
    /// Positive means the rep is short of pipeline.
    pub pipeline_gap: Decimal,
    pub activity_email: u64,
    pub activity_phone: u64,
    pub activity_total: u64,
    pub meetings_needed: i64,
    pub meetings_scheduled: i64,
    pub meeting_gap: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub rep_count: usize,
    pub total_quota: Decimal,
    pub total_forecast: Decimal,
    pub percent_to_quota: Decimal,
    pub total_closed_won: Decimal,
    pub total_pipeline: Decimal,
    pub total_pipeline_gap: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub name: String,
    pub forecast_amount: Decimal,
    pub percent_to_quota: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineShortfall {
    pub name: String,
    pub pipeline_gap: Decimal,
    pub meetings_needed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub top_performers: Vec<TopPerformer>,
    pub largest_pipeline_gaps: Vec<PipelineShortfall>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub period: ReportingPeriod,
    pub date_range: (chrono::NaiveDate, chrono::NaiveDate),
    pub settings: CalculationSettings,
    /// Totals over every rep, regardless of filters.
    pub summary: DashboardSummary,
    pub rows: Vec<QuotaRow>,
    pub total_rows: usize,
    /// Filter choices, taken from every rep.
    pub managers: Vec<String>,
    pub rep_names: Vec<String>,
    pub insights: Insights,
    pub warnings: Vec<String>,
}
