use crate::domain::dashboard::QuotaRow;
use rust_decimal::Decimal;

const HEADER: [&str; 17] = [
    "AE Name",
    "Manager Name",
    "Forecast Amount",
    "Quota Amount",
    "Percent to Quota (%)",
    "Closed Won",
    "Remainder",
    "Pipeline Coverage Ratio",
    "Pipeline You Should Have",
    "Open Pipeline with CW Date in Month",
    "Pipeline Gap",
    "Activity Email",
    "Activity Phone",
    "Activity Total",
    "Meetings Needed",
    "Meetings Scheduled",
    "Meeting Gap",
];

pub fn filename(year: i32, month: u32) -> String {
    format!("ae_dashboard_{}_{:02}.csv", year, month)
}

/// Raw numbers, not display-formatted, so the file re-imports cleanly.
pub fn render(rows: &[QuotaRow]) -> String {
    let mut out = HEADER.join(",");
    out.push('\n');

    for row in rows {
        let fields = [
            escape(&row.name),
            escape(row.manager_name.as_deref().unwrap_or_default()),
            number(row.forecast_amount),
            number(row.monthly_quota),
            number(row.percent_to_quota),
            number(row.closed_won),
            number(row.remaining_quota),
            row.pipeline_coverage_ratio.map(number).unwrap_or_default(),
            number(row.pipeline_should_have),
            number(row.open_pipeline),
            number(row.pipeline_gap),
            row.activity_email.to_string(),
            row.activity_phone.to_string(),
            row.activity_total.to_string(),
            row.meetings_needed.to_string(),
            row.meetings_scheduled.to_string(),
            row.meeting_gap.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn number(value: Decimal) -> String {
    value.normalize().to_string()
}

fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
