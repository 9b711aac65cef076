//! Analyze-response shaping.
//!
//! `/analyze` payloads come in two generations: a flat record (possibly
//! wrapped in `response`/`data`, possibly a one-element array) and a rich
//! envelope with `manual_search`, `processed_json` and `model_result`
//! sections. Both are reduced here to display-ready view-models in which
//! every field is either a formatted string or the em-dash sentinel.

use serde_json::Value;

use crate::api::ApiError;
use crate::catalog::{first_display, first_number, value_display};

pub const EM_DASH: &str = "—";

/// Identifier chain for the detail panel header.
pub const STAR_ID_ALIASES: &[&str] =
    &["GAIA", "ID", "tid", "ALLWISE", "TWOMASS", "UCAC", "TYC"];
const SUMMARY_MAG_ALIASES: &[&str] = &["Tmag", "GAIAmag", "Vmag", "st_tmag"];

#[derive(Debug, Clone, PartialEq)]
pub struct TransitEntry {
    pub period: String,
    pub depth: Option<String>,
    pub duration: Option<String>,
}

/// Flat single-star summary driving the system view and detail header.
#[derive(Debug, Clone)]
pub struct AnalyzeSummary {
    pub star_id: String,
    pub ra: String,
    pub dec: String,
    pub magnitude: String,
    pub temperature: String,
    pub distance: String,
    pub teff_k: Option<f64>,
    pub exoplanet_count: Option<u64>,
    pub transits: Vec<TransitEntry>,
}

/// Left-panel star information, every field display-ready.
#[derive(Debug, Clone)]
pub struct StarInfo {
    pub source: String,
    pub tic: String,
    pub gaia_id: String,
    pub ra: String,
    pub dec: String,
    pub tmag: String,
    pub vmag: String,
    pub teff: String,
    pub dist_pc: String,
    pub radius_sun: String,
    pub mass_sun: String,
    pub logg: String,
    pub lum_sun: String,
    pub lumclass: String,
    pub parallax_mas: String,
    pub pm_ra: String,
    pub pm_dec: String,
    pub bp: String,
    pub rp: String,
    pub catalog_ids: Vec<String>,
    pub timing_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visualization {
    pub kind: String,
    pub filename: String,
    pub data_url: String,
}

#[derive(Debug, Clone)]
pub struct ModelVerdict {
    pub label: String,
    pub probability_pct: Option<u8>,
    pub model_type: String,
    pub optimization_type: String,
    pub prediction_count: String,
    pub status: String,
    pub threshold: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub star: StarInfo,
    pub visualizations: Vec<Visualization>,
    pub model: ModelVerdict,
}

/// Everything the results view needs from one analyze response.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub summary: AnalyzeSummary,
    pub report: AnalysisReport,
}

/// Resolve the record inside an analyze payload: unwrap `response` or
/// `data`, take the first element of an array, and treat anything
/// unresolvable as absent.
pub fn unwrap_envelope(payload: &Value) -> Option<&Value> {
    let inner = if !payload["response"].is_null() {
        &payload["response"]
    } else if !payload["data"].is_null() {
        &payload["data"]
    } else {
        payload
    };
    let resolved = match inner {
        Value::Array(items) => items.first()?,
        other => other,
    };
    if resolved.is_null() {
        None
    } else {
        Some(resolved)
    }
}

/// Flat summary of an analyze record. An unresolvable record is the
/// distinct empty-response condition, never a record of em-dashes.
pub fn summarize(payload: &Value) -> Result<AnalyzeSummary, ApiError> {
    let record = unwrap_envelope(payload).ok_or(ApiError::EmptyResponse)?;
    Ok(AnalyzeSummary {
        star_id: first_display(record, STAR_ID_ALIASES)
            .unwrap_or_else(|| crate::catalog::UNKNOWN.to_string()),
        ra: suffixed(record, &["ra", "RA_orig"], "°"),
        dec: suffixed(record, &["dec", "Dec_orig"], "°"),
        magnitude: first_display(record, SUMMARY_MAG_ALIASES)
            .unwrap_or_else(|| EM_DASH.to_string()),
        temperature: suffixed(record, &["Teff", "st_teff"], " K"),
        distance: suffixed(record, &["d", "st_dist"], " pc"),
        teff_k: first_number(record, &["Teff", "st_teff"]),
        exoplanet_count: record.get("pl_pnum").and_then(Value::as_u64),
        transits: transits_from(record),
    })
}

fn suffixed(record: &Value, aliases: &[&str], suffix: &str) -> String {
    match first_display(record, aliases) {
        Some(value) => format!("{value}{suffix}"),
        None => EM_DASH.to_string(),
    }
}

fn transits_from(record: &Value) -> Vec<TransitEntry> {
    let Some(period) = record.get("pl_orbper").filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    let field = |key: &str| {
        record
            .get(key)
            .filter(|v| !v.is_null())
            .map(value_display)
    };
    vec![TransitEntry {
        period: format!("{} days", value_display(period)),
        depth: field("pl_trandep"),
        duration: field("pl_trandurh").map(|v| format!("{v} h")),
    }]
}

/// Map a raw model probability onto 0..=100.
///
/// Three regimes: already a fraction, a logit squashed through the
/// logistic for small magnitudes, and direct clamping for anything else.
pub fn probability_to_percent(p: f64) -> u8 {
    if p <= 0.0 {
        0
    } else if p <= 1.0 {
        (p * 100.0).round() as u8
    } else if p < 6.0 {
        (100.0 / (1.0 + (-p).exp())).round() as u8
    } else {
        p.round().clamp(0.0, 100.0) as u8
    }
}

/// Verdict label from the classifier's class string.
pub fn verdict_label(class: &str) -> &'static str {
    let class = class.to_lowercase();
    if class.contains("false") {
        "False Positive"
    } else if class.contains("candidate") || class.contains("confirmed") {
        "Planet Candidate"
    } else {
        "Result"
    }
}

/// Normalize the rich envelope into `{star, visualizations, model}`.
/// Missing sections at any nesting level degrade to empty/em-dash values.
pub fn normalize_results(api: &Value) -> AnalysisReport {
    let manual = &api["manual_search"];
    let raw = &manual["raw"];
    let stellar = &manual["stellar"];

    let field = |record: &Value, key: &str| -> Option<String> {
        record
            .get(key)
            .filter(|v| !v.is_null())
            .map(value_display)
            .filter(|s| !s.is_empty())
    };
    let dash = |value: Option<String>| value.unwrap_or_else(|| EM_DASH.to_string());

    let star = StarInfo {
        source: dash(field(manual, "source")),
        tic: dash(field(raw, "ID")),
        gaia_id: dash(field(raw, "GAIA")),
        ra: dash(field(raw, "ra").or_else(|| field(raw, "RA_orig"))),
        dec: dash(field(raw, "dec").or_else(|| field(raw, "Dec_orig"))),
        tmag: dash(field(stellar, "st_tmag").or_else(|| field(raw, "Tmag"))),
        vmag: dash(field(raw, "Vmag")),
        teff: dash(field(stellar, "st_teff").or_else(|| field(raw, "Teff"))),
        dist_pc: dash(field(stellar, "st_dist").or_else(|| field(raw, "d"))),
        radius_sun: dash(field(stellar, "st_rad").or_else(|| field(raw, "rad"))),
        mass_sun: dash(field(stellar, "st_mass").or_else(|| field(raw, "mass"))),
        logg: dash(field(stellar, "st_logg").or_else(|| field(raw, "logg"))),
        lum_sun: dash(field(raw, "lum")),
        lumclass: dash(field(raw, "lumclass")),
        parallax_mas: dash(field(raw, "plx")),
        pm_ra: dash(field(raw, "pmRA")),
        pm_dec: dash(field(raw, "pmDEC")),
        bp: dash(field(raw, "gaiabp")),
        rp: dash(field(raw, "gaiarp")),
        catalog_ids: ["ALLWISE", "TWOMASS", "UCAC", "APASS"]
            .iter()
            .filter_map(|key| field(raw, key))
            .collect(),
        timing_ms: manual["timing_ms"].as_f64(),
    };

    let mut visualizations = Vec::new();
    if let Some(processed) = api["processed_json"].as_array() {
        for entry in processed {
            let Some(items) = entry["visualizations"].as_array() else {
                continue;
            };
            for item in items {
                let Some(data) = item["data"].as_str() else {
                    continue;
                };
                if !data.starts_with("data:image/") {
                    continue;
                }
                visualizations.push(Visualization {
                    kind: item["type"].as_str().unwrap_or("").to_string(),
                    filename: item["filename"].as_str().unwrap_or("").to_string(),
                    data_url: data.to_string(),
                });
            }
        }
    }

    let model_result = &api["model_result"];
    let top = &model_result["results"][0];
    let class = top["class"].as_str().unwrap_or("");
    let model = ModelVerdict {
        label: verdict_label(class).to_string(),
        probability_pct: top["probability"]
            .as_f64()
            .filter(|p| p.is_finite())
            .map(probability_to_percent),
        model_type: dash(field(model_result, "model_type")),
        optimization_type: dash(field(model_result, "optimization_type")),
        prediction_count: dash(field(model_result, "prediction_count")),
        status: dash(field(model_result, "status")),
        threshold: dash(field(model_result, "threshold")),
    };

    AnalysisReport {
        star,
        visualizations,
        model,
    }
}

/// Shape a full analyze payload into summary + report.
pub fn shape_analyze_response(payload: Value) -> Result<AnalysisOutcome, ApiError> {
    let summary = if payload["manual_search"].is_object() {
        summarize(&merged_record(
            &payload["manual_search"]["raw"],
            &payload["manual_search"]["stellar"],
        ))?
    } else {
        summarize(&payload)?
    };
    let report = normalize_results(&payload);
    Ok(AnalysisOutcome { summary, report })
}

/// Merge the catalog row with the stellar-parameter block; raw fields win.
fn merged_record(raw: &Value, stellar: &Value) -> Value {
    let mut merged = serde_json::Map::new();
    if let Some(fields) = stellar.as_object() {
        merged.extend(fields.clone());
    }
    if let Some(fields) = raw.as_object() {
        merged.extend(fields.clone());
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_unwraps_response_data_and_bare_shapes() {
        let bare = json!({"ID": "TIC1"});
        assert_eq!(unwrap_envelope(&bare).unwrap()["ID"], "TIC1");

        let wrapped = json!({"response": {"ID": "TIC2"}});
        assert_eq!(unwrap_envelope(&wrapped).unwrap()["ID"], "TIC2");

        let data = json!({"data": [{"ID": "TIC3"}, {"ID": "TIC4"}]});
        assert_eq!(unwrap_envelope(&data).unwrap()["ID"], "TIC3");
    }

    #[test]
    fn empty_array_is_the_empty_response_condition() {
        let err = summarize(&json!([])).unwrap_err();
        assert_eq!(err, ApiError::EmptyResponse);
        let err = summarize(&json!({"data": []})).unwrap_err();
        assert_eq!(err, ApiError::EmptyResponse);
    }

    #[test]
    fn summary_formats_units_only_when_present() {
        let summary = summarize(&json!({
            "GAIA": "G99",
            "ra": 266.417,
            "Teff": 3042,
            "pl_pnum": 2,
            "pl_orbper": 11.2,
            "pl_trandurh": 1.4,
        }))
        .unwrap();
        assert_eq!(summary.star_id, "G99");
        assert_eq!(summary.ra, "266.417°");
        assert_eq!(summary.dec, EM_DASH);
        assert_eq!(summary.temperature, "3042 K");
        assert_eq!(summary.distance, EM_DASH);
        assert_eq!(summary.teff_k, Some(3042.0));
        assert_eq!(summary.exoplanet_count, Some(2));
        assert_eq!(
            summary.transits,
            vec![TransitEntry {
                period: "11.2 days".to_string(),
                depth: None,
                duration: Some("1.4 h".to_string()),
            }]
        );
    }

    #[test]
    fn percent_mapping_boundaries() {
        assert_eq!(probability_to_percent(0.0), 0);
        assert_eq!(probability_to_percent(-3.0), 0);
        assert_eq!(probability_to_percent(1.0), 100);
        assert_eq!(probability_to_percent(0.5), 50);
        // logit regime
        assert_eq!(probability_to_percent(2.0), 88);
        // direct clamp regime
        assert_eq!(probability_to_percent(73.0), 73);
        assert_eq!(probability_to_percent(250.0), 100);
    }

    #[test]
    fn percent_mapping_is_monotone_within_each_regime() {
        let fraction: Vec<u8> = [0.1, 0.3, 0.5, 0.9, 1.0]
            .iter()
            .map(|p| probability_to_percent(*p))
            .collect();
        assert!(fraction.windows(2).all(|w| w[0] <= w[1]));

        let logit: Vec<u8> = [1.1, 2.0, 3.0, 4.5, 5.9]
            .iter()
            .map(|p| probability_to_percent(*p))
            .collect();
        assert!(logit.windows(2).all(|w| w[0] <= w[1]));

        let clamp: Vec<u8> = [6.0, 25.0, 80.0, 100.0, 900.0]
            .iter()
            .map(|p| probability_to_percent(*p))
            .collect();
        assert!(clamp.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn percent_mapping_is_idempotent_on_its_output_domain() {
        for p in [0.0, 0.37, 0.99, 2.5, 5.9, 42.0, 150.0] {
            let once = probability_to_percent(p);
            assert_eq!(probability_to_percent(f64::from(once)), once);
        }
    }

    #[test]
    fn verdict_labels_match_on_substrings() {
        assert_eq!(verdict_label("FALSE POSITIVE"), "False Positive");
        assert_eq!(verdict_label("planet candidate"), "Planet Candidate");
        assert_eq!(verdict_label("Confirmed"), "Planet Candidate");
        assert_eq!(verdict_label("inconclusive"), "Result");
    }

    #[test]
    fn missing_processed_json_yields_no_visualizations() {
        let report = normalize_results(&json!({}));
        assert!(report.visualizations.is_empty());
        assert_eq!(report.star.tic, EM_DASH);
        assert_eq!(report.model.label, "Result");

        let report = normalize_results(&json!({"processed_json": []}));
        assert!(report.visualizations.is_empty());
    }

    #[test]
    fn visualizations_keep_only_embedded_images() {
        let report = normalize_results(&json!({
            "processed_json": [
                {"visualizations": [
                    {"type": "light_curve", "filename": "lc.png", "data": "data:image/png;base64,AAAA"},
                    {"type": "bad", "filename": "x.txt", "data": "hello"},
                    {"type": "no_data"},
                ]},
                {"no_visualizations_here": true},
            ],
        }));
        assert_eq!(report.visualizations.len(), 1);
        assert_eq!(report.visualizations[0].kind, "light_curve");
        assert_eq!(report.visualizations[0].filename, "lc.png");
    }

    #[test]
    fn rich_envelope_merges_stellar_into_the_summary() {
        let outcome = shape_analyze_response(json!({
            "manual_search": {
                "source": "TIC",
                "raw": {"ID": "TIC1", "ra": 10.0},
                "stellar": {"st_teff": 5800, "st_dist": 42.0},
                "timing_ms": 120.5,
            },
            "model_result": {
                "results": [{"class": "candidate", "probability": 0.92}],
                "model_type": "xgb",
            },
        }))
        .unwrap();
        assert_eq!(outcome.summary.star_id, "TIC1");
        assert_eq!(outcome.summary.temperature, "5800 K");
        assert_eq!(outcome.summary.distance, "42.0 pc");
        assert_eq!(outcome.report.star.timing_ms, Some(120.5));
        assert_eq!(outcome.report.model.label, "Planet Candidate");
        assert_eq!(outcome.report.model.probability_pct, Some(92));
        assert_eq!(outcome.report.model.model_type, "xgb");
    }
}
