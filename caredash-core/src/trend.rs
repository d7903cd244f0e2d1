//! Summary statistics and chart series over a patient's screening history.
//!
//! Every function here sorts its input by screening date first, so the
//! result never depends on the order the API returned the records in.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DashboardConfig, HealthScreening};

/// Direction of change between the earliest and the latest screening.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    #[serde(rename = "insufficient data")]
    InsufficientData,
    #[serde(rename = "stable")]
    Stable,
    #[serde(rename = "improving")]
    Improving,
    #[serde(rename = "worsening")]
    Worsening,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient data",
            Self::Stable => "stable",
            Self::Improving => "improving",
            Self::Worsening => "worsening",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One chart point: formatted date on x, score on y.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub date: String,
    pub screening_date: NaiveDate,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreeningSummary {
    pub average_score: f64,
    pub trend: Trend,
    pub total: usize,
    pub points: Vec<ChartPoint>,
}

impl ScreeningSummary {
    /// Average rounded for display, e.g. `"4.3"`.
    pub fn average_label(&self) -> String {
        format!("{:.1}", self.average_score)
    }
}

/// Ascending by date. Same-day screenings fall back to id order.
pub fn sorted_by_date(screenings: &[HealthScreening]) -> Vec<&HealthScreening> {
    let mut sorted: Vec<&HealthScreening> = screenings.iter().collect();
    sorted.sort_by(|a, b| {
        a.screening_date
            .cmp(&b.screening_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

/// Arithmetic mean of all scores, `0.0` for an empty history.
pub fn average_score(screenings: &[HealthScreening]) -> f64 {
    if screenings.is_empty() {
        return 0.0;
    }
    // Summing in sorted order keeps the float result identical for any
    // permutation of the input.
    let sum: f64 = sorted_by_date(screenings).iter().map(|s| s.score).sum();
    sum / screenings.len() as f64
}

pub fn classify_trend(screenings: &[HealthScreening], stable_threshold: f64) -> Trend {
    let sorted = sorted_by_date(screenings);
    if sorted.len() < 2 {
        return Trend::InsufficientData;
    }

    let diff = sorted[sorted.len() - 1].score - sorted[0].score;
    if diff.abs() < stable_threshold {
        Trend::Stable
    } else if diff < 0.0 {
        Trend::Improving
    } else {
        Trend::Worsening
    }
}

pub fn chart_series(screenings: &[HealthScreening], date_format: &str) -> Vec<ChartPoint> {
    sorted_by_date(screenings)
        .into_iter()
        .map(|screening| ChartPoint {
            date: screening.screening_date.format(date_format).to_string(),
            screening_date: screening.screening_date,
            score: screening.score,
        })
        .collect()
}

pub fn summarize_screenings(
    screenings: &[HealthScreening],
    config: &DashboardConfig,
) -> ScreeningSummary {
    ScreeningSummary {
        average_score: average_score(screenings),
        trend: classify_trend(screenings, config.stable_threshold),
        total: screenings.len(),
        points: chart_series(screenings, &config.chart_date_format),
    }
}
