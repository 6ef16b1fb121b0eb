//! Pure views derived from a forecast series: day summaries, day cards and
//! the hourly chart of one day.

use chrono::NaiveDate;

use crate::types::{
    day_label, Axis, AxisId, AxisPosition, Dataset, DatasetKind, DayCard, ForecastReading,
    HourlyChart, HourlySeries,
};

/// One reading per day: the 12:00 one, in series order.
///
/// Days without a midday reading are left out.
pub fn daily_summaries(series: &[ForecastReading]) -> Vec<&ForecastReading> {
    series.iter().filter(|r| r.is_midday()).collect()
}

pub fn day_cards(series: &[ForecastReading], icon_url_template: &str) -> Vec<DayCard> {
    daily_summaries(series)
        .into_iter()
        .map(|r| DayCard {
            day: r.day(),
            label: day_label(r.day()),
            icon_url: icon_url(icon_url_template, &r.icon),
            temperature: r.temperature,
            humidity: r.humidity,
            wind_speed: r.wind_speed,
            pressure: r.pressure,
        })
        .collect()
}

pub fn icon_url(template: &str, icon: &str) -> String {
    template.replace("{icon}", icon)
}

/// Distinct calendar days in series order.
pub fn days(series: &[ForecastReading]) -> Vec<NaiveDate> {
    let mut out: Vec<NaiveDate> = Vec::new();
    for reading in series {
        let day = reading.day();
        if !out.contains(&day) {
            out.push(day);
        }
    }
    out
}

/// Readings of `day`, aligned into temperature / humidity / precipitation.
///
/// `None` when no day is selected or nothing in the series falls on it.
pub fn hourly_series(series: &[ForecastReading], day: Option<NaiveDate>) -> Option<HourlySeries> {
    let day = day?;
    let readings: Vec<&ForecastReading> = series.iter().filter(|r| r.day() == day).collect();
    if readings.is_empty() {
        return None;
    }

    Some(HourlySeries {
        day,
        labels: readings.iter().map(|r| r.hour_label()).collect(),
        temperature: readings.iter().map(|r| r.temperature).collect(),
        humidity: readings.iter().map(|r| f64::from(r.humidity)).collect(),
        precipitation: readings.iter().map(|r| r.precipitation()).collect(),
    })
}

pub fn hourly_chart(series: &[ForecastReading], day: Option<NaiveDate>) -> Option<HourlyChart> {
    hourly_series(series, day).map(HourlyChart::from)
}

impl From<HourlySeries> for HourlyChart {
    fn from(hourly: HourlySeries) -> Self {
        let datasets = vec![
            line(
                "Température (°C)",
                hourly.temperature,
                "rgba(255, 99, 132, 1)",
                "rgba(255, 99, 132, 0.2)",
            ),
            line(
                "Humidité (%)",
                hourly.humidity,
                "rgba(54, 162, 235, 1)",
                "rgba(54, 162, 235, 0.2)",
            ),
            Dataset {
                kind: DatasetKind::Bar,
                label: "Précipitations (mm)".to_string(),
                data: hourly.precipitation,
                border_color: "rgba(75, 192, 192, 1)".to_string(),
                background_color: "rgba(75, 192, 192, 0.2)".to_string(),
                fill: None,
                tension: None,
                point_radius: None,
                axis: AxisId::Secondary,
            },
        ];

        Self {
            day: hourly.day,
            title: format!("Données horaires pour {}", day_label(hourly.day)),
            labels: hourly.labels,
            datasets,
            axes: vec![
                Axis {
                    id: AxisId::Primary,
                    position: AxisPosition::Left,
                    begin_at_zero: true,
                    draw_grid: true,
                },
                Axis {
                    id: AxisId::Secondary,
                    position: AxisPosition::Right,
                    begin_at_zero: true,
                    draw_grid: false,
                },
            ],
        }
    }
}

fn line(label: &str, data: Vec<f64>, border: &str, background: &str) -> Dataset {
    Dataset {
        kind: DatasetKind::Line,
        label: label.to_string(),
        data,
        border_color: border.to_string(),
        background_color: background.to_string(),
        fill: Some(false),
        tension: Some(0.1),
        point_radius: Some(0),
        axis: AxisId::Primary,
    }
}
