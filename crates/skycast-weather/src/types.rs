use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Timestamp layout of the provider's `dt_txt` field
pub const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout used for day labels on cards and chart titles
pub const DAY_LABEL_FORMAT: &str = "%d/%m/%Y";

/// Time of day picked to represent a whole day
pub fn midday() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// One timestamped forecast point (3 hour step)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReading {
    /// Provider-local timestamp (the provider reports UTC)
    pub timestamp: NaiveDateTime,
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: u8,
    /// m/s
    pub wind_speed: f64,
    /// hPa
    pub pressure: f64,
    /// Volume over the preceding 3 hours, mm
    pub rain_3h: Option<f64>,
    pub icon: String,
}

impl ForecastReading {
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn is_midday(&self) -> bool {
        self.timestamp.time() == midday()
    }

    /// Precipitation with a missing field counted as none
    pub fn precipitation(&self) -> f64 {
        self.rain_3h.unwrap_or(0.0)
    }

    /// X-axis label, e.g. `"15h"`
    pub fn hour_label(&self) -> String {
        format!("{}h", self.timestamp.hour())
    }
}

/// All readings from one fetch, ascending by timestamp
pub type ForecastSeries = Vec<ForecastReading>;

pub fn day_label(day: NaiveDate) -> String {
    day.format(DAY_LABEL_FORMAT).to_string()
}

/// Everything a day card shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCard {
    pub day: NaiveDate,
    pub label: String,
    pub icon_url: String,
    pub temperature: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub pressure: f64,
}

/// The three aligned hourly series for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySeries {
    pub day: NaiveDate,
    pub labels: Vec<String>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub precipitation: Vec<f64>,
}

impl HourlySeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Line,
    Bar,
}

/// Which y axis a dataset is drawn against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisId {
    /// Temperature and humidity, left side
    #[serde(rename = "y1")]
    Primary,
    /// Precipitation, right side
    #[serde(rename = "y2")]
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisPosition {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(rename = "type")]
    pub kind: DatasetKind,
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub background_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_radius: Option<u32>,
    #[serde(rename = "yAxisID")]
    pub axis: AxisId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub id: AxisId,
    pub position: AxisPosition,
    pub begin_at_zero: bool,
    /// Grid lines drawn across the chart area
    pub draw_grid: bool,
}

/// Chart-ready hourly view of one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyChart {
    pub day: NaiveDate,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub axes: Vec<Axis>,
}

/// Wire formats of the two providers
pub mod api {
    use serde::Deserialize;

    /// Address search response (GeoJSON feature collection)
    #[derive(Debug, Deserialize)]
    pub struct GeocodeResponse {
        pub features: Vec<GeocodeFeature>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodeFeature {
        pub properties: FeatureProperties,
    }

    #[derive(Debug, Deserialize)]
    pub struct FeatureProperties {
        #[serde(rename = "type")]
        pub kind: String,
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Vec<ForecastEntry>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastEntry {
        pub dt_txt: String,
        pub main: MainBlock,
        pub wind: WindBlock,
        pub weather: Vec<WeatherBlock>,
        #[serde(default)]
        pub rain: Option<RainBlock>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainBlock {
        pub temp: f64,
        pub humidity: u8,
        pub pressure: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct WindBlock {
        pub speed: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct WeatherBlock {
        pub icon: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct RainBlock {
        #[serde(rename = "3h", default)]
        pub three_hours: Option<f64>,
    }
}

impl TryFrom<api::ForecastEntry> for ForecastReading {
    type Error = WeatherError;

    fn try_from(entry: api::ForecastEntry) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT)
            .map_err(|e| WeatherError::Parse(format!("bad dt_txt {:?}: {}", entry.dt_txt, e)))?;

        let icon = entry
            .weather
            .into_iter()
            .next()
            .map(|w| w.icon)
            .ok_or_else(|| WeatherError::Parse(format!("no weather block at {}", entry.dt_txt)))?;

        Ok(Self {
            timestamp,
            temperature: entry.main.temp,
            humidity: entry.main.humidity,
            wind_speed: entry.wind.speed,
            pressure: entry.main.pressure,
            rain_3h: entry.rain.and_then(|r| r.three_hours),
            icon,
        })
    }
}
