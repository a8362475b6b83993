// Read model for the "today" list and the per-day totals chart.
//
// Registered as a store observer: every store change recomputes the cached view from
// the full entry set, so readers never see a view older than the last mutation.

use crate::modules::work_logs::core::entry::LogEntry;
use crate::modules::work_logs::core::errors::PersistenceError;
use crate::modules::work_logs::core::projections::{daily_totals, today_subset, total_hours};
use crate::modules::work_logs::core::store::{StoreChange, StoreObserver};
use crate::shared::core::primitives::{Clock, local_date};
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayView {
    pub date: NaiveDate,
    pub entries: Vec<LogEntry>,
    pub total_hours: f64,
}

#[derive(Debug, Default)]
struct Cache {
    entries: Vec<LogEntry>,
    today: Option<TodayView>,
    totals: BTreeMap<NaiveDate, f64>,
}

pub struct ViewProjection<Tz: TimeZone> {
    clock: Arc<dyn Clock>,
    tz: Tz,
    cache: Mutex<Cache>,
}

impl<Tz: TimeZone + Send + Sync> ViewProjection<Tz> {
    pub fn new(clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            clock,
            tz,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Seeds the view with entries loaded before the projection was registered.
    pub fn with_entries(self, entries: &[LogEntry]) -> Self {
        self.recompute(entries);
        self
    }

    pub fn today(&self) -> TodayView {
        let mut cache = self.lock();
        let date = local_date(self.clock.now(), &self.tz);
        match &cache.today {
            Some(view) if view.date == date => view.clone(),
            // The local day rolled over since the last store change.
            _ => {
                let view = self.today_view(&cache.entries);
                cache.today = Some(view.clone());
                view
            }
        }
    }

    pub fn daily_totals(&self) -> BTreeMap<NaiveDate, f64> {
        self.lock().totals.clone()
    }

    fn recompute(&self, entries: &[LogEntry]) {
        let today = self.today_view(entries);
        let totals = daily_totals(entries, &self.tz);
        let mut cache = self.lock();
        cache.entries = entries.to_vec();
        cache.today = Some(today);
        cache.totals = totals;
    }

    fn today_view(&self, entries: &[LogEntry]) -> TodayView {
        let now = self.clock.now();
        let subset = today_subset(entries, now, &self.tz);
        TodayView {
            date: local_date(now, &self.tz),
            total_hours: total_hours(&subset),
            entries: subset,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<Tz> StoreObserver for ViewProjection<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    fn on_change(
        &self,
        change: &StoreChange,
        entries: &[LogEntry],
    ) -> Result<(), PersistenceError> {
        tracing::trace!(?change, "recomputing today view");
        self.recompute(entries);
        Ok(())
    }
}
