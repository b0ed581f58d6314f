use super::model::QuotaRow;
use rust_decimal::Decimal;
use serde::Serialize;

/// Inclusive bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Table filters. Empty name lists select everyone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowFilter {
    pub managers: Vec<String>,
    pub reps: Vec<String>,
    pub percent_to_quota: Range<Decimal>,
    pub closed_won: Range<Decimal>,
    pub open_pipeline: Range<Decimal>,
    pub meetings_scheduled: Range<i64>,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
            && self.reps.is_empty()
            && self.percent_to_quota.is_open()
            && self.closed_won.is_open()
            && self.open_pipeline.is_open()
            && self.meetings_scheduled.is_open()
    }

    pub fn matches(&self, row: &QuotaRow) -> bool {
        let manager_ok = self.managers.is_empty()
            || row
                .manager_name
                .as_deref()
                .is_some_and(|manager| contains_name(&self.managers, manager));
        let rep_ok = self.reps.is_empty() || contains_name(&self.reps, &row.name);

        manager_ok
            && rep_ok
            && self.percent_to_quota.contains(row.percent_to_quota)
            && self.closed_won.contains(row.closed_won)
            && self.open_pipeline.contains(row.open_pipeline)
            && self.meetings_scheduled.contains(row.meetings_scheduled)
    }

    pub fn apply(&self, rows: Vec<QuotaRow>) -> Vec<QuotaRow> {
        if self.is_empty() {
            return rows;
        }
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }

    /// Human-readable list of the active constraints.
    pub fn describe(&self) -> Vec<String> {
        let mut active = Vec::new();
        if !self.managers.is_empty() {
            active.push(format!("{} manager(s)", self.managers.len()));
        }
        if !self.reps.is_empty() {
            active.push(format!("{} AE(s)", self.reps.len()));
        }
        push_range(&mut active, "% to quota", &self.percent_to_quota);
        push_range(&mut active, "Closed won", &self.closed_won);
        push_range(&mut active, "Pipeline", &self.open_pipeline);
        push_range(&mut active, "Meetings", &self.meetings_scheduled);
        active
    }
}

fn contains_name(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.trim().eq_ignore_ascii_case(name.trim()))
}

fn push_range<T: std::fmt::Display + PartialOrd + Copy>(out: &mut Vec<String>, label: &str, range: &Range<T>) {
    match (range.min, range.max) {
        (None, None) => {}
        (Some(min), None) => out.push(format!("{} >= {}", label, min)),
        (None, Some(max)) => out.push(format!("{} <= {}", label, max)),
        (Some(min), Some(max)) => out.push(format!("{} {}-{}", label, min, max)),
    }
}
