// Pure read-side derivations over the entry collection.
//
// - today_subset: entries whose timestamp falls in the caller's local calendar day.
// - daily_totals: hours summed per local calendar date.

use crate::modules::work_logs::core::entry::LogEntry;
use crate::shared::core::primitives::{local_date, local_day_bounds};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

/// Entries inside `[start_of_day, start_of_next_day)` of `now`'s local date, newest first.
pub fn today_subset<Tz: TimeZone>(entries: &[LogEntry], now: DateTime<Utc>, tz: &Tz) -> Vec<LogEntry> {
    let (start, end) = local_day_bounds(local_date(now, tz), tz);
    let mut today: Vec<LogEntry> = entries
        .iter()
        .filter(|e| e.timestamp >= start && e.timestamp < end)
        .cloned()
        .collect();
    sort_newest_first(&mut today);
    today
}

pub fn daily_totals<Tz: TimeZone>(entries: &[LogEntry], tz: &Tz) -> BTreeMap<NaiveDate, f64> {
    entries.iter().fold(BTreeMap::new(), |mut totals, entry| {
        *totals.entry(local_date(entry.timestamp, tz)).or_insert(0.0) += entry.duration_hours;
        totals
    })
}

pub fn total_hours(entries: &[LogEntry]) -> f64 {
    entries.iter().map(|e| e.duration_hours).sum()
}

pub fn sort_newest_first(entries: &mut [LogEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
