//! View state for the dashboard.
//!
//! The controller owns every piece of mutable state and never performs I/O
//! beyond the city store. Operations that need the network hand back a
//! request ticket; whoever runs the request feeds the outcome back through
//! `apply_suggestions` / `apply_forecast`. Each ticket carries the sequence
//! number of its slot, and only the latest ticket of a slot is applied, so
//! a slow stale response can never overwrite fresher state.
//!
//! Phases: `Idle` → `Loading(city)` on mount or city change →
//! `Loaded(city, day)` on fetch success → `Loaded(city, day')` on day
//! selection → `Loading(city')` on a new selection. Failures leave the
//! phase and all data untouched.

use chrono::NaiveDate;
use skycast_core::{AppError, WeatherConfig};

use crate::error::WeatherError;
use crate::geocode::query_needs_lookup;
use crate::projection;
use crate::store::CityStore;
use crate::types::{DayCard, ForecastSeries, HourlyChart};

/// Pending autocomplete lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestRequest {
    pub seq: u64,
    pub query: String,
}

/// Pending forecast fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    pub seq: u64,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { city: String },
    Loaded { city: String, day: Option<NaiveDate> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Idle,
    Loading,
    Loaded,
}

pub struct ViewController {
    store: Box<dyn CityStore>,
    icon_url_template: String,
    min_query_len: usize,

    query: String,
    suggestions: Vec<String>,
    city: String,
    series: ForecastSeries,
    selected_day: Option<NaiveDate>,
    status: Status,

    suggest_seq: u64,
    forecast_seq: u64,
}

impl ViewController {
    /// Build the controller, reading the last city from `store`.
    ///
    /// Falls back to `config.default_city` when nothing is stored or the
    /// store can't be read.
    pub fn new(store: impl CityStore + 'static, config: &WeatherConfig) -> Self {
        let city = match store.load() {
            Ok(Some(city)) => city,
            Ok(None) => config.default_city.clone(),
            Err(e) => {
                let err = AppError::from(e);
                tracing::warn!("{} ({})", err.user_message(), err);
                config.default_city.clone()
            }
        };

        Self {
            store: Box::new(store),
            icon_url_template: config.icon_url_template.clone(),
            min_query_len: config.min_query_len,
            query: String::new(),
            suggestions: Vec::new(),
            city,
            series: ForecastSeries::new(),
            selected_day: None,
            status: Status::Idle,
            suggest_seq: 0,
            forecast_seq: 0,
        }
    }

    /// Initial fetch for the starting city. Only issued once, from `Idle`.
    pub fn mount(&mut self) -> Option<ForecastRequest> {
        if self.status != Status::Idle {
            return None;
        }
        Some(self.issue_forecast())
    }

    /// Update the search text.
    ///
    /// Short queries clear the suggestions right away and need no lookup.
    pub fn set_query(&mut self, text: &str) -> Option<SuggestRequest> {
        self.query = text.to_string();
        self.suggest_seq += 1;

        if !query_needs_lookup(text, self.min_query_len) {
            self.suggestions.clear();
            return None;
        }

        Some(SuggestRequest {
            seq: self.suggest_seq,
            query: self.query.clone(),
        })
    }

    /// Apply the outcome of a lookup. Returns true if state changed.
    pub fn apply_suggestions(
        &mut self,
        request: &SuggestRequest,
        result: Result<Vec<String>, WeatherError>,
    ) -> bool {
        if request.seq != self.suggest_seq {
            tracing::debug!(
                "Dropping suggestions for {:?} (seq {} < {})",
                request.query,
                request.seq,
                self.suggest_seq
            );
            return false;
        }

        match result {
            Ok(names) => {
                self.suggestions = names;
                true
            }
            Err(e) => {
                let err = AppError::from(e);
                tracing::error!("Error fetching city data for {:?}: {} ({})", request.query, err, err.user_message());
                false
            }
        }
    }

    /// Search field lost focus. In-flight lookups are invalidated too.
    pub fn dismiss_suggestions(&mut self) {
        self.suggestions.clear();
        self.suggest_seq += 1;
    }

    /// Pick a city (usually one of the suggestions).
    ///
    /// Always persists the choice. Returns a fetch only when the city
    /// actually changed or nothing was fetched yet.
    pub fn select_city(&mut self, name: &str) -> Option<ForecastRequest> {
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!("Ignoring empty city selection");
            return None;
        }

        self.query = name.to_string();
        self.dismiss_suggestions();

        if let Err(e) = self.store.save(name) {
            let err = AppError::from(e);
            tracing::warn!("Failed to persist city {:?}: {} ({})", name, err, err.user_message());
        }

        if name == self.city && self.status != Status::Idle {
            return None;
        }

        self.city = name.to_string();
        Some(self.issue_forecast())
    }

    /// Apply the outcome of a fetch. Returns true if state changed.
    pub fn apply_forecast(
        &mut self,
        request: &ForecastRequest,
        result: Result<ForecastSeries, WeatherError>,
    ) -> bool {
        if request.seq != self.forecast_seq {
            tracing::debug!(
                "Dropping forecast for {} (seq {} < {})",
                request.city,
                request.seq,
                self.forecast_seq
            );
            return false;
        }

        match result {
            Ok(series) => {
                self.selected_day = series.first().map(|r| r.day());
                self.series = series;
                self.status = Status::Loaded;
                true
            }
            Err(e) => {
                let err = AppError::from(e);
                tracing::error!("Error fetching weather data for {}: {} ({})", request.city, err, err.user_message());
                false
            }
        }
    }

    /// Drill into `day`. Days absent from the current series are rejected.
    pub fn select_day(&mut self, day: NaiveDate) -> bool {
        if !self.series.iter().any(|r| r.day() == day) {
            tracing::debug!("Day {} is not in the forecast", day);
            return false;
        }
        self.selected_day = Some(day);
        true
    }

    fn issue_forecast(&mut self) -> ForecastRequest {
        self.forecast_seq += 1;
        self.status = Status::Loading;
        ForecastRequest {
            seq: self.forecast_seq,
            city: self.city.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.status {
            Status::Idle => Phase::Idle,
            Status::Loading => Phase::Loading {
                city: self.city.clone(),
            },
            Status::Loaded => Phase::Loaded {
                city: self.city.clone(),
                day: self.selected_day,
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Last successfully fetched series (may belong to a previous city while loading)
    pub fn series(&self) -> &ForecastSeries {
        &self.series
    }

    pub fn selected_day(&self) -> Option<NaiveDate> {
        self.selected_day
    }

    pub fn day_cards(&self) -> Vec<DayCard> {
        projection::day_cards(&self.series, &self.icon_url_template)
    }

    pub fn hourly_chart(&self) -> Option<HourlyChart> {
        projection::hourly_chart(&self.series, self.selected_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCityStore;
    use crate::types::{ForecastReading, DT_TXT_FORMAT};
    use chrono::NaiveDateTime;
    use std::sync::Arc;

    fn reading(dt_txt: &str, temperature: f64) -> ForecastReading {
        ForecastReading {
            timestamp: NaiveDateTime::parse_from_str(dt_txt, DT_TXT_FORMAT).unwrap(),
            temperature,
            humidity: 70,
            wind_speed: 3.0,
            pressure: 1010.0,
            rain_3h: None,
            icon: "02d".to_string(),
        }
    }

    fn series() -> ForecastSeries {
        vec![
            reading("2024-01-01 12:00:00", 5.0),
            reading("2024-01-01 15:00:00", 6.0),
            reading("2024-01-02 12:00:00", 7.0),
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn controller() -> ViewController {
        ViewController::new(MemoryCityStore::new(), &WeatherConfig::default())
    }

    fn loaded() -> ViewController {
        let mut c = controller();
        let req = c.mount().unwrap();
        assert!(c.apply_forecast(&req, Ok(series())));
        c
    }

    #[test]
    fn test_starts_idle_with_default_city() {
        let c = controller();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.city(), "Paris");
    }

    #[test]
    fn test_starts_with_stored_city() {
        let c = ViewController::new(MemoryCityStore::with_city("Lyon"), &WeatherConfig::default());
        assert_eq!(c.city(), "Lyon");
    }

    #[test]
    fn test_mount_issues_one_fetch() {
        let mut c = controller();
        let req = c.mount().unwrap();
        assert_eq!(req.city, "Paris");
        assert_eq!(c.phase(), Phase::Loading { city: "Paris".into() });
        assert!(c.mount().is_none());
    }

    #[test]
    fn test_fetch_success_selects_first_day() {
        let c = loaded();
        assert_eq!(
            c.phase(),
            Phase::Loaded {
                city: "Paris".into(),
                day: Some(date(2024, 1, 1))
            }
        );
        assert_eq!(c.day_cards().len(), 2);
        let chart = c.hourly_chart().unwrap();
        assert_eq!(chart.labels, vec!["12h", "15h"]);
    }

    #[test]
    fn test_empty_series_leaves_day_unset() {
        let mut c = controller();
        let req = c.mount().unwrap();
        assert!(c.apply_forecast(&req, Ok(Vec::new())));
        assert_eq!(c.selected_day(), None);
        assert!(c.hourly_chart().is_none());
    }

    #[test]
    fn test_fetch_failure_keeps_state() {
        let mut c = loaded();
        let req = c.select_city("Lyon").unwrap();
        assert!(!c.apply_forecast(&req, Err(WeatherError::Parse("boom".into()))));

        assert_eq!(c.phase(), Phase::Loading { city: "Lyon".into() });
        assert_eq!(c.series().len(), 3);
        assert_eq!(c.selected_day(), Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_stale_forecast_is_dropped() {
        let mut c = controller();
        let paris = c.mount().unwrap();
        let lyon = c.select_city("Lyon").unwrap();

        assert!(c.apply_forecast(&lyon, Ok(vec![reading("2024-03-01 12:00:00", 12.0)])));
        assert!(!c.apply_forecast(&paris, Ok(series())));

        assert_eq!(c.city(), "Lyon");
        assert_eq!(c.series().len(), 1);
        assert_eq!(c.selected_day(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_select_day() {
        let mut c = loaded();
        assert!(c.select_day(date(2024, 1, 2)));
        assert_eq!(c.hourly_chart().unwrap().labels, vec!["12h"]);

        assert!(!c.select_day(date(2024, 5, 5)));
        assert_eq!(c.selected_day(), Some(date(2024, 1, 2)));
    }

    #[test]
    fn test_new_series_resets_selected_day() {
        let mut c = loaded();
        c.select_day(date(2024, 1, 2));
        let req = c.select_city("Lyon").unwrap();
        c.apply_forecast(&req, Ok(vec![reading("2024-01-03 00:00:00", 1.0)]));
        assert_eq!(c.selected_day(), Some(date(2024, 1, 3)));
    }

    #[test]
    fn test_short_query_clears_without_lookup() {
        let mut c = controller();
        let req = c.set_query("lyo").unwrap();
        c.apply_suggestions(&req, Ok(vec!["Lyon".into()]));
        assert_eq!(c.suggestions(), ["Lyon".to_string()]);

        for q in ["", "l", "ly"] {
            assert!(c.set_query(q).is_none());
            assert!(c.suggestions().is_empty());
        }
    }

    #[test]
    fn test_lowered_threshold_still_skips_two_char_queries() {
        let config = WeatherConfig {
            min_query_len: 2,
            ..WeatherConfig::default()
        };
        let mut c = ViewController::new(MemoryCityStore::new(), &config);
        assert!(c.set_query("ly").is_none());
        assert!(c.suggestions().is_empty());
        assert!(c.set_query("lyo").is_some());
    }

    #[test]
    fn test_stale_suggestions_do_not_overwrite_short_query() {
        let mut c = controller();
        let req = c.set_query("lyo").unwrap();
        assert!(c.set_query("ly").is_none());

        assert!(!c.apply_suggestions(&req, Ok(vec!["Lyon".into()])));
        assert!(c.suggestions().is_empty());
    }

    #[test]
    fn test_only_latest_lookup_applies() {
        let mut c = controller();
        let first = c.set_query("mar").unwrap();
        let second = c.set_query("mars").unwrap();

        assert!(c.apply_suggestions(&second, Ok(vec!["Marseille".into()])));
        assert!(!c.apply_suggestions(&first, Ok(vec!["Marcq".into(), "Marly".into()])));
        assert_eq!(c.suggestions(), ["Marseille".to_string()]);
    }

    #[test]
    fn test_lookup_failure_keeps_previous_suggestions() {
        let mut c = controller();
        let req = c.set_query("lyo").unwrap();
        c.apply_suggestions(&req, Ok(vec!["Lyon".into()]));

        let req = c.set_query("lyon").unwrap();
        assert!(!c.apply_suggestions(&req, Err(WeatherError::Http { status: 500, message: String::new() })));
        assert_eq!(c.suggestions(), ["Lyon".to_string()]);
    }

    #[test]
    fn test_dismiss_clears_and_invalidates() {
        let mut c = controller();
        let req = c.set_query("nan").unwrap();
        c.dismiss_suggestions();
        assert!(!c.apply_suggestions(&req, Ok(vec!["Nantes".into()])));
        assert!(c.suggestions().is_empty());
    }

    #[test]
    fn test_select_city_clears_sets_and_persists() {
        let store = Arc::new(MemoryCityStore::new());
        let mut c = ViewController::new(store.clone(), &WeatherConfig::default());
        c.mount();

        let req = c.set_query("lyo").unwrap();
        c.apply_suggestions(&req, Ok(vec!["Lyon".into()]));

        let fetch = c.select_city("Lyon").unwrap();
        assert_eq!(fetch.city, "Lyon");
        assert!(c.suggestions().is_empty());
        assert_eq!(c.query(), "Lyon");
        assert_eq!(c.city(), "Lyon");

        let reopened = ViewController::new(store, &WeatherConfig::default());
        assert_eq!(reopened.city(), "Lyon");
    }

    #[test]
    fn test_reselecting_same_city_does_not_refetch() {
        let mut c = loaded();
        assert!(c.select_city("Paris").is_none());
        assert!(c.select_city("Lyon").is_some());
    }

    #[test]
    fn test_select_city_from_idle_replaces_mount() {
        let mut c = controller();
        let req = c.select_city("Paris").unwrap();
        assert_eq!(req.city, "Paris");
        assert!(c.mount().is_none());
    }
}
