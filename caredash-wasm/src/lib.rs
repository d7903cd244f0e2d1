//! Framework-neutral WASM <-> JavaScript bridge for the screening analytics.

use caredash_core::{score_severity, summarize_screenings, DashboardConfig, HealthScreening};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsDashboardConfig {
    #[serde(default)]
    stable_threshold: Option<f64>,
    #[serde(default)]
    chart_date_format: Option<String>,
}

impl From<JsDashboardConfig> for DashboardConfig {
    fn from(cfg: JsDashboardConfig) -> Self {
        let mut base = DashboardConfig::default();
        if let Some(threshold) = cfg.stable_threshold {
            base.stable_threshold = threshold;
        }
        if let Some(format) = cfg.chart_date_format {
            base.chart_date_format = format;
        }
        base
    }
}

/// Average, trend label and chart series for an array of screenings as
/// returned by `GET /api/patients/{id}/health-screenings`.
#[wasm_bindgen]
pub fn summarize_screening_history(
    screenings: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let screenings = from_value::<serde_json::Value>(screenings)
        .map_err(|err| JsValue::from_str(&format!("Could not read screenings JSON: {err}")))?;
    let screenings: Vec<HealthScreening> = serde_json::from_value(screenings)
        .map_err(|err| JsValue::from_str(&format!("Screenings are malformed: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsDashboardConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            DashboardConfig::from(cfg)
        }
        None => DashboardConfig::default(),
    };

    let summary = summarize_screenings(&screenings, &cfg);
    to_value(&summary)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize summary: {err}")))
}

/// Display band (`"high"`, `"moderate"`, `"low"`) for one score.
#[wasm_bindgen]
pub fn screening_score_band(score: f64) -> Result<JsValue, JsValue> {
    to_value(&score_severity(score))
        .map_err(|err| JsValue::from_str(&format!("Could not serialize band: {err}")))
}
