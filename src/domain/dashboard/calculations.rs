//! Pure arithmetic from query results to quota rows.

use super::filter::RowFilter;
use super::model::{
    CalculationSettings, DashboardReport, DashboardSummary, Insights, PipelineShortfall,
    QuotaRow, RawDashboardData, RemainderPolicy, TopPerformer,
};
use super::period::ReportingPeriod;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;

const INSIGHT_LIMIT: usize = 5;
const MONEY_DP: u32 = 2;
const RATIO_DP: u32 = 2;

pub fn remaining_quota(monthly_quota: Decimal, closed_won: Decimal, policy: RemainderPolicy) -> Decimal {
    let remaining = monthly_quota - closed_won;
    match policy {
        RemainderPolicy::AllowNegative => remaining,
        RemainderPolicy::ClampAtZero => remaining.max(Decimal::ZERO),
    }
}

pub fn pipeline_should_have(remaining: Decimal, coverage_ratio: Decimal) -> Decimal {
    remaining * coverage_ratio
}

pub fn pipeline_gap(remaining: Decimal, coverage_ratio: Decimal, open_pipeline: Decimal) -> Decimal {
    pipeline_should_have(remaining, coverage_ratio) - open_pipeline
}

/// `floor((remaining / avg_deal_size) / win_rate)`, zero once quota is met.
pub fn meetings_needed(remaining: Decimal, avg_deal_size: Decimal, win_rate: Decimal) -> i64 {
    if remaining <= Decimal::ZERO {
        return 0;
    }

    remaining
        .checked_div(avg_deal_size)
        .and_then(|deals| deals.checked_div(win_rate))
        .and_then(|meetings| meetings.floor().to_i64())
        .unwrap_or(0)
}

pub fn percent_to_quota(forecast: Decimal, quota: Decimal) -> Decimal {
    if quota <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    forecast / quota * Decimal::ONE_HUNDRED
}

/// Historic ratio `pipeline / closed_won`, only when both are positive.
pub fn coverage_ratio(total_pipeline: Decimal, closed_won: Decimal) -> Option<Decimal> {
    if total_pipeline > Decimal::ZERO && closed_won > Decimal::ZERO {
        total_pipeline.checked_div(closed_won)
    } else {
        None
    }
}

pub fn build_rows(raw: &RawDashboardData, settings: &CalculationSettings) -> Vec<QuotaRow> {
    raw.reps
        .iter()
        .map(|rep| {
            let amount = |map: &std::collections::HashMap<String, Decimal>| {
                map.get(&rep.id).copied().unwrap_or_default()
            };
            let count = |map: &std::collections::HashMap<String, u64>| {
                map.get(&rep.id).copied().unwrap_or_default()
            };

            let monthly_quota = amount(&raw.quota);
            let forecast_amount = amount(&raw.forecast);
            let closed_won = amount(&raw.closed_won);
            let open_pipeline = amount(&raw.open_pipeline);
            let historic_ratio = raw.coverage_ratios.get(&rep.id).copied();
            let ratio = historic_ratio.unwrap_or(settings.default_coverage_ratio);

            let remaining = remaining_quota(monthly_quota, closed_won, settings.remainder_policy);
            let needed = meetings_needed(remaining, settings.avg_deal_size, settings.win_rate);
            let scheduled = i64::try_from(count(&raw.meetings)).unwrap_or(i64::MAX);
            let activity_email = count(&raw.email_activity);
            let activity_phone = count(&raw.phone_activity);

            QuotaRow {
                owner_id: rep.id.clone(),
                name: rep.name.clone(),
                manager_name: rep.manager_name.clone(),
                monthly_quota,
                forecast_amount,
                percent_to_quota: percent_to_quota(forecast_amount, monthly_quota).round_dp(MONEY_DP),
                closed_won,
                remaining_quota: remaining,
                pipeline_coverage_ratio: historic_ratio.map(|r| r.round_dp(RATIO_DP)),
                pipeline_should_have: pipeline_should_have(remaining, ratio).round_dp(MONEY_DP),
                open_pipeline,
                pipeline_gap: pipeline_gap(remaining, ratio, open_pipeline).round_dp(MONEY_DP),
                activity_email,
                activity_phone,
                activity_total: activity_email + activity_phone,
                meetings_needed: needed,
                meetings_scheduled: scheduled,
                meeting_gap: scheduled - needed,
            }
        })
        .collect()
}

pub fn summarize(rows: &[QuotaRow]) -> DashboardSummary {
    let total = |f: fn(&QuotaRow) -> Decimal| rows.iter().map(f).sum::<Decimal>();
    let total_quota = total(|r| r.monthly_quota);
    let total_forecast = total(|r| r.forecast_amount);

    DashboardSummary {
        rep_count: rows.len(),
        total_quota,
        total_forecast,
        percent_to_quota: percent_to_quota(total_forecast, total_quota).round_dp(MONEY_DP),
        total_closed_won: total(|r| r.closed_won),
        total_pipeline: total(|r| r.open_pipeline),
        total_pipeline_gap: total(|r| r.pipeline_gap),
    }
}

pub fn insights(rows: &[QuotaRow]) -> Insights {
    let mut by_percent: Vec<&QuotaRow> = rows.iter().collect();
    by_percent.sort_by(|a, b| descending(a.percent_to_quota, b.percent_to_quota));

    let mut by_gap: Vec<&QuotaRow> = rows.iter().collect();
    by_gap.sort_by(|a, b| descending(a.pipeline_gap, b.pipeline_gap));

    Insights {
        top_performers: by_percent
            .into_iter()
            .take(INSIGHT_LIMIT)
            .map(|r| TopPerformer {
                name: r.name.clone(),
                forecast_amount: r.forecast_amount,
                percent_to_quota: r.percent_to_quota,
            })
            .collect(),
        largest_pipeline_gaps: by_gap
            .into_iter()
            .take(INSIGHT_LIMIT)
            .map(|r| PipelineShortfall {
                name: r.name.clone(),
                pipeline_gap: r.pipeline_gap,
                meetings_needed: r.meetings_needed,
            })
            .collect(),
    }
}

/// Rows, totals and insights for one render. Totals cover every rep;
/// the table and insights follow the filter.
pub fn build_report(
    period: ReportingPeriod,
    raw: &RawDashboardData,
    settings: &CalculationSettings,
    filter: &RowFilter,
) -> DashboardReport {
    let all_rows = build_rows(raw, settings);
    let summary = summarize(&all_rows);
    let total_rows = all_rows.len();
    let managers = distinct_sorted(all_rows.iter().filter_map(|r| r.manager_name.as_deref()));
    let rep_names = distinct_sorted(all_rows.iter().map(|r| r.name.as_str()));
    let rows = filter.apply(all_rows);
    let insights = insights(&rows);

    DashboardReport {
        period,
        date_range: period.date_range(),
        settings: settings.clone(),
        summary,
        rows,
        total_rows,
        managers,
        rep_names,
        insights,
        warnings: raw.warnings.clone(),
    }
}

fn distinct_sorted<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .map(str::to_string)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn descending(a: Decimal, b: Decimal) -> Ordering {
    b.cmp(&a)
}
