//! Server-rendered HTML pages.

use super::format::{count, currency, optional_text, percent, ratio};
use crate::domain::access::SessionContext;
use crate::domain::dashboard::{DashboardReport, QuotaRow, Range, RowFilter};
use crate::domain::salesforce::SalesforceStatus;
use crate::infrastructure::salesforce::ConnectionSource;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::time::Duration;

const STYLE: &str = r#"
    body {
      font-family: system-ui, -apple-system, sans-serif;
      margin: 0;
      background: #f5f5f5;
      color: #333;
    }
    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      padding: 1rem 2rem;
      background: white;
      box-shadow: 0 2px 8px rgba(0,0,0,0.1);
    }
    header form { display: inline; margin-left: 0.5rem; }
    main { padding: 1.5rem 2rem; }
    .card {
      background: white;
      border-radius: 12px;
      box-shadow: 0 2px 8px rgba(0,0,0,0.1);
      padding: 1.5rem;
      margin-bottom: 1.5rem;
    }
    .centered { max-width: 480px; margin: 4rem auto; text-align: center; }
    .metrics { display: flex; gap: 1rem; flex-wrap: wrap; }
    .metric { flex: 1; min-width: 160px; }
    .metric .label { color: #666; font-size: 0.85rem; }
    .metric .value { font-size: 1.6rem; font-weight: 600; }
    .metric .delta { color: #666; font-size: 0.85rem; }
    table { border-collapse: collapse; width: 100%; font-size: 0.85rem; }
    th, td { padding: 0.4rem 0.6rem; border-bottom: 1px solid #eee; text-align: right; }
    th:first-child, td:first-child, th:nth-child(2), td:nth-child(2) { text-align: left; }
    .shortfall { color: #dc2626; font-weight: 600; }
    .warning { background: #fff7ed; border-left: 4px solid #f97316; padding: 0.6rem 1rem; margin-bottom: 0.5rem; }
    .error { background: #fef2f2; border-left: 4px solid #dc2626; padding: 0.6rem 1rem; }
    .filters { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 0.8rem; }
    .filters label { display: block; font-size: 0.8rem; color: #666; }
    .insights { display: flex; gap: 1.5rem; flex-wrap: wrap; }
    .insights > div { flex: 1; min-width: 280px; }
    .button {
      display: inline-block;
      padding: 0.5rem 1rem;
      border-radius: 6px;
      border: none;
      background: #0176d3;
      color: white;
      text-decoration: none;
      cursor: pointer;
    }
    .button.secondary { background: #e5e7eb; color: #333; }
    .muted { color: #666; font-size: 0.85rem; }
    pre { background: #f3f4f6; padding: 1rem; overflow: auto; font-size: 0.8rem; }
"#;

/// Everything the dashboard page shows for one request.
pub struct DashboardPage<'a> {
    pub report: &'a DashboardReport,
    pub filter: &'a RowFilter,
    pub session: &'a SessionContext,
    pub salesforce: &'a SalesforceStatus,
    pub source: ConnectionSource,
    /// Query string (without `?`) reproducing the current selection.
    pub query: &'a str,
    pub from_cache: bool,
    pub elapsed: Duration,
    pub debug: bool,
}

pub fn dashboard(page: &DashboardPage<'_>) -> String {
    let report = page.report;
    let mut body = String::new();

    body.push_str(&period_selector(report));
    body.push_str(&summary(report));

    for warning in &report.warnings {
        body.push_str(&format!(r#"<div class="warning">{}</div>"#, escape(warning)));
    }

    body.push_str(&filters(page));
    body.push_str(&table(report, page.query));
    body.push_str(&insights(report));
    body.push_str(&format!(
        r#"<p class="muted">Loaded in {:.2}s{}.</p>"#,
        page.elapsed.as_secs_f64(),
        if page.from_cache { " (cached)" } else { "" }
    ));

    if page.debug {
        body.push_str(&debug_panel(page));
    }

    layout(
        &format!("AE Dashboard - {}", report.period.label()),
        page.session,
        true,
        &body,
    )
}

pub fn sign_in(session: &SessionContext) -> String {
    let body = r#"<div class="card centered">
  <h1>Sign in required</h1>
  <p>This dashboard is restricted to authorised users.</p>
  <p><a class="button" href="/auth/azure/login">Sign in with Microsoft</a></p>
</div>"#;
    layout("Sign in", session, false, body)
}

pub fn access_denied(session: &SessionContext, email: &str) -> String {
    let body = format!(
        r#"<div class="card centered">
  <h1>Access denied</h1>
  <p><strong>{}</strong> is not allowed to view this dashboard.</p>
  <p>Contact an administrator to be added to the allow-list.</p>
  <form method="post" action="/auth/azure/logout"><button class="button secondary" type="submit">Sign out</button></form>
</div>"#,
        escape(email)
    );
    layout("Access denied", session, false, &body)
}

pub fn connect_salesforce(session: &SessionContext, oauth_available: bool) -> String {
    let body = if oauth_available {
        r#"<div class="card centered">
  <h1>Connect to Salesforce</h1>
  <p>The dashboard reads opportunities, activities and forecasts from your Salesforce org.</p>
  <p><a class="button" href="/auth/salesforce/connect">Connect with Salesforce</a></p>
</div>"#
            .to_string()
    } else {
        r#"<div class="card centered">
  <h1>Salesforce is not configured</h1>
  <div class="error">Set <code>SALESFORCE_CLIENT_ID</code> and <code>SALESFORCE_CLIENT_SECRET</code>
  for OAuth, or <code>SALESFORCE_USERNAME</code>, <code>SALESFORCE_PASSWORD</code> and
  <code>SALESFORCE_SECURITY_TOKEN</code> for a password login.</div>
</div>"#
            .to_string()
    };
    layout("Connect to Salesforce", session, false, &body)
}

/// Inline error; `reconnect` offers a fresh Salesforce connection.
pub fn error(session: &SessionContext, message: &str, reconnect: bool) -> String {
    let action = if reconnect {
        r#"<p><a class="button" href="/auth/salesforce/connect">Reconnect to Salesforce</a></p>"#
    } else {
        r#"<p><a class="button secondary" href="/">Try again</a></p>"#
    };
    let body = format!(
        r#"<div class="card centered">
  <h1>Something went wrong</h1>
  <div class="error">{}</div>
  {}
</div>"#,
        escape(message),
        action
    );
    layout("Error", session, false, &body)
}

fn layout(title: &str, session: &SessionContext, salesforce_connected: bool, body: &str) -> String {
    let mut account = String::new();
    if let Some(identity) = &session.identity {
        account.push_str(&format!(
            r#"<span class="muted">{} ({})</span><form method="post" action="/auth/azure/logout"><button class="button secondary" type="submit">Sign out</button></form>"#,
            escape(&identity.display_name),
            escape(&identity.email)
        ));
    }
    if salesforce_connected {
        account.push_str(
            r#"<form method="post" action="/auth/salesforce/disconnect"><button class="button secondary" type="submit">Disconnect Salesforce</button></form>"#,
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{title}</title>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <style>{style}</style>
</head>
<body>
  <header>
    <strong>AE Quota Dashboard</strong>
    <div>{account}</div>
  </header>
  <main>
{body}
  </main>
</body>
</html>"#,
        title = escape(title),
        style = STYLE,
        account = account,
        body = body
    )
}

fn period_selector(report: &DashboardReport) -> String {
    let months = (1..=12u32)
        .map(|m| {
            let name = crate::domain::dashboard::ReportingPeriod::new(report.period.year, m)
                .map(|p| p.month_name())
                .unwrap_or_default();
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                m,
                selected(m == report.period.month),
                name
            )
        })
        .collect::<String>();
    let (start, end) = report.date_range;

    format!(
        r#"<div class="card">
  <form method="get" action="/">
    <label>Month <select name="month">{months}</select></label>
    <label>Year <input type="number" name="year" value="{year}" min="2000" max="2100"></label>
    <label>Avg deal size <input type="number" name="avg_deal_size" value="{deal}" min="1" step="any"></label>
    <label>Win rate <input type="number" name="win_rate" value="{win}" min="0.01" max="1" step="0.01"></label>
    <button class="button" type="submit">Load</button>
  </form>
  <p class="muted">{label}: {start} to {end}</p>
</div>
"#,
        months = months,
        year = report.period.year,
        deal = report.settings.avg_deal_size.normalize(),
        win = report.settings.win_rate.normalize(),
        label = report.period.label(),
        start = start,
        end = end
    )
}

fn summary(report: &DashboardReport) -> String {
    let s = &report.summary;
    format!(
        r#"<div class="card metrics">
  {}{}{}{}{}
</div>
"#,
        metric("Total Quota", &currency(s.total_quota), None),
        metric(
            "Total Forecast",
            &currency(s.total_forecast),
            Some(&format!("{} to quota", percent(s.percent_to_quota)))
        ),
        metric("Total Closed Won", &currency(s.total_closed_won), None),
        metric("Total Pipeline", &currency(s.total_pipeline), None),
        metric(
            "Total Pipeline Gap",
            &currency(s.total_pipeline_gap),
            Some(if s.total_pipeline_gap > Decimal::ZERO { "shortfall" } else { "covered" })
        ),
    )
}

fn metric(label: &str, value: &str, delta: Option<&str>) -> String {
    format!(
        r#"<div class="metric"><div class="label">{}</div><div class="value">{}</div>{}</div>"#,
        label,
        value,
        delta
            .map(|d| format!(r#"<div class="delta">{}</div>"#, escape(d)))
            .unwrap_or_default()
    )
}

fn filters(page: &DashboardPage<'_>) -> String {
    let report = page.report;
    let filter = page.filter;

    format!(
        r#"<div class="card">
  <form method="get" action="/">
    <input type="hidden" name="month" value="{month}">
    <input type="hidden" name="year" value="{year}">
    <div class="filters">
      <div><label>Managers</label><select name="manager" multiple size="4">{managers}</select></div>
      <div><label>AEs</label><select name="rep" multiple size="4">{reps}</select></div>
      {percent}
      {closed_won}
      {pipeline}
      {meetings}
    </div>
    <p><button class="button" type="submit">Apply filters</button> <a class="button secondary" href="/?month={month}&year={year}">Clear</a></p>
  </form>
  <p class="muted">Showing {shown} of {total} AEs{active}</p>
</div>
"#,
        month = report.period.month,
        year = report.period.year,
        managers = options(&report.managers, &filter.managers),
        reps = options(&report.rep_names, &filter.reps),
        percent = range_inputs("% to quota", "percent", &filter.percent_to_quota),
        closed_won = range_inputs("Closed won", "closed_won", &filter.closed_won),
        pipeline = range_inputs("Pipeline", "pipeline", &filter.open_pipeline),
        meetings = range_inputs("Meetings", "meetings", &filter.meetings_scheduled),
        shown = report.rows.len(),
        total = report.total_rows,
        active = {
            let described = filter.describe();
            if described.is_empty() {
                String::new()
            } else {
                format!(" ({})", escape(&described.join(", ")))
            }
        }
    )
}

fn options(choices: &[String], chosen: &[String]) -> String {
    choices
        .iter()
        .map(|choice| {
            let is_chosen = chosen.iter().any(|c| c.eq_ignore_ascii_case(choice));
            format!(
                r#"<option value="{0}"{1}>{0}</option>"#,
                escape(choice),
                selected(is_chosen)
            )
        })
        .collect()
}

fn range_inputs<T: Display + PartialOrd + Copy>(label: &str, name: &str, range: &Range<T>) -> String {
    let value = |bound: Option<T>| bound.map(|v| v.to_string()).unwrap_or_default();
    format!(
        r#"<div><label>{label}</label><input type="number" step="any" name="min_{name}" placeholder="min" value="{min}"> <input type="number" step="any" name="max_{name}" placeholder="max" value="{max}"></div>"#,
        label = label,
        name = name,
        min = value(range.min),
        max = value(range.max)
    )
}

fn table(report: &DashboardReport, query: &str) -> String {
    let export = if query.is_empty() {
        "/api/dashboard/export.csv".to_string()
    } else {
        format!("/api/dashboard/export.csv?{}", escape(query))
    };

    if report.rows.is_empty() {
        return r#"<div class="card"><p>No AEs match the current selection.</p></div>"#.to_string();
    }

    let rows = report.rows.iter().map(table_row).collect::<String>();
    format!(
        r#"<div class="card">
  <p><a class="button secondary" href="{export}">Download CSV</a></p>
  <table>
    <thead><tr>
      <th>AE Name</th><th>Manager</th><th>Forecast</th><th>Quota</th><th>% to Quota</th>
      <th>Closed Won</th><th>Remainder</th><th>Coverage</th><th>Pipeline Needed</th>
      <th>Open Pipeline</th><th>Pipeline Gap</th><th>Email</th><th>Phone</th><th>Activity</th>
      <th>Meetings Needed</th><th>Meetings Scheduled</th><th>Meeting Gap</th>
    </tr></thead>
    <tbody>
{rows}
    </tbody>
  </table>
</div>
"#,
        export = export,
        rows = rows
    )
}

fn table_row(row: &QuotaRow) -> String {
    let gap_class = if row.pipeline_gap > Decimal::ZERO { r#" class="shortfall""# } else { "" };
    let meeting_class = if row.meeting_gap < 0 { r#" class="shortfall""# } else { "" };

    format!(
        "      <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td{}>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td{}>{}</td></tr>\n",
        escape(&row.name),
        escape(optional_text(row.manager_name.as_deref())),
        currency(row.forecast_amount),
        currency(row.monthly_quota),
        percent(row.percent_to_quota),
        currency(row.closed_won),
        currency(row.remaining_quota),
        ratio(row.pipeline_coverage_ratio),
        currency(row.pipeline_should_have),
        currency(row.open_pipeline),
        gap_class,
        currency(row.pipeline_gap),
        count(row.activity_email),
        count(row.activity_phone),
        count(row.activity_total),
        count(row.meetings_needed),
        count(row.meetings_scheduled),
        meeting_class,
        count(row.meeting_gap),
    )
}

fn insights(report: &DashboardReport) -> String {
    let top = report
        .insights
        .top_performers
        .iter()
        .map(|p| {
            format!(
                "<li>{}: {} ({})</li>",
                escape(&p.name),
                percent(p.percent_to_quota),
                currency(p.forecast_amount)
            )
        })
        .collect::<String>();
    let gaps = report
        .insights
        .largest_pipeline_gaps
        .iter()
        .map(|g| {
            format!(
                "<li>{}: {} gap, {} meetings needed</li>",
                escape(&g.name),
                currency(g.pipeline_gap),
                count(g.meetings_needed)
            )
        })
        .collect::<String>();

    format!(
        r#"<div class="card insights">
  <div><h3>Top performers</h3><ol>{}</ol></div>
  <div><h3>Largest pipeline gaps</h3><ol>{}</ol></div>
</div>
"#,
        top, gaps
    )
}

fn debug_panel(page: &DashboardPage<'_>) -> String {
    let details = serde_json::json!({
        "session": page.session,
        "salesforce": page.salesforce,
        "connection_source": page.source,
        "settings": page.report.settings,
        "filter": page.filter,
        "from_cache": page.from_cache,
        "elapsed_ms": page.elapsed.as_millis() as u64,
        "warnings": page.report.warnings,
    });
    let pretty = serde_json::to_string_pretty(&details).unwrap_or_default();

    format!(
        r#"<div class="card"><h3>Debug</h3><pre>{}</pre></div>"#,
        escape(&pretty)
    )
}

fn selected(is_selected: bool) -> &'static str {
    if is_selected {
        " selected"
    } else {
        ""
    }
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
