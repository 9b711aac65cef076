//! Star-catalog response shaping.
//!
//! Search rows arrive with mission-dependent field names (TIC, Gaia, object
//! id, several magnitude systems). Each logical attribute is resolved
//! through an ordered alias list so the priority is auditable in one place,
//! and the full raw row is kept on the record for downstream lookups.

use serde_json::Value;

use crate::api::ApiError;

pub const UNKNOWN: &str = "Unknown";

/// Primary identifier, in priority order.
pub const ID_ALIASES: &[&str] = &["ID", "objID", "tid", "GAIA"];
/// Display-name sources; when absent the name falls back to "Star <id>".
pub const NAME_ALIASES: &[&str] = &["ID", "objID"];
const SECONDARY_ID_ALIASES: &[&str] = &["tid", "GAIA"];
pub const TYPE_ALIASES: &[&str] = &["typeSrc", "lumclass"];
pub const MAGNITUDE_ALIASES: &[&str] = &["Tmag", "GAIAmag", "Vmag"];
pub const DISTANCE_ALIASES: &[&str] = &["d", "st_dist"];
const TEFF_ALIASES: &[&str] = &["Teff", "st_teff", "teff"];
/// Identifier chain tried when submitting a star for analysis.
pub const ANALYZE_ID_ALIASES: &[&str] =
    &["ID", "objID", "tid", "GAIA", "ALLWISE", "TWOMASS", "UCAC", "TYC"];

/// First alias whose value is present and non-null.
pub fn first_defined<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// First alias rendering to a non-empty display string.
pub fn first_display(record: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| record.get(*key))
        .filter(|value| !value.is_null())
        .map(value_display)
        .find(|text| !text.is_empty())
}

/// First alias holding a number.
pub fn first_number(record: &Value, aliases: &[&str]) -> Option<f64> {
    first_defined(record, aliases).and_then(Value::as_f64)
}

pub(crate) fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// One star from a search response, alias-resolved but non-destructive:
/// the backend row is kept verbatim in `raw`.
#[derive(Debug, Clone)]
pub struct StarRecord {
    pub id: String,
    pub name: String,
    pub spectral_type: String,
    pub magnitude: Option<f64>,
    pub distance_pc: Option<f64>,
    pub raw: Value,
}

impl StarRecord {
    pub fn from_raw(raw: Value) -> Self {
        let id = first_display(&raw, ID_ALIASES).unwrap_or_else(|| UNKNOWN.to_string());
        let name = first_display(&raw, NAME_ALIASES).unwrap_or_else(|| {
            let secondary = first_display(&raw, SECONDARY_ID_ALIASES).unwrap_or_default();
            format!("Star {secondary}").trim_end().to_string()
        });
        let spectral_type =
            first_display(&raw, TYPE_ALIASES).unwrap_or_else(|| UNKNOWN.to_string());
        let magnitude = first_number(&raw, MAGNITUDE_ALIASES);
        let distance_pc = first_number(&raw, DISTANCE_ALIASES);
        Self {
            id,
            name,
            spectral_type,
            magnitude,
            distance_pc,
            raw,
        }
    }

    pub fn magnitude_label(&self) -> String {
        match self.magnitude {
            Some(mag) => format!("{mag}"),
            None => "N/A".to_string(),
        }
    }

    pub fn distance_label(&self) -> String {
        match self.distance_pc {
            Some(d) => format!("{d:.1} pc"),
            None => "N/A".to_string(),
        }
    }

    /// Right ascension in degrees. `ra` arrives in degrees, the legacy
    /// `RA_orig` field in radians.
    pub fn ra_deg(&self) -> Option<f64> {
        self.raw
            .get("ra")
            .and_then(Value::as_f64)
            .or_else(|| {
                self.raw
                    .get("RA_orig")
                    .and_then(Value::as_f64)
                    .map(f64::to_degrees)
            })
            .filter(|v| v.is_finite())
    }

    pub fn dec_deg(&self) -> Option<f64> {
        self.raw
            .get("dec")
            .and_then(Value::as_f64)
            .or_else(|| {
                self.raw
                    .get("Dec_orig")
                    .and_then(Value::as_f64)
                    .map(f64::to_degrees)
            })
            .filter(|v| v.is_finite())
    }

    pub fn teff_k(&self) -> Option<f64> {
        first_number(&self.raw, TEFF_ALIASES)
    }

    /// Every identifier worth trying against `/analyze`, in priority order.
    pub fn analyze_id_candidates(&self) -> Vec<String> {
        let mut ids: Vec<String> = ANALYZE_ID_ALIASES
            .iter()
            .filter_map(|key| {
                self.raw
                    .get(*key)
                    .filter(|v| !v.is_null())
                    .map(value_display)
            })
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() && self.id != UNKNOWN {
            ids.push(self.id.clone());
        }
        ids.dedup();
        ids
    }
}

pub fn map_stars(rows: &[Value]) -> Vec<StarRecord> {
    rows.iter().cloned().map(StarRecord::from_raw).collect()
}

/// Shape a `/search` payload: `{status: "success", data: [...]}`.
pub fn shape_search_response(payload: Value) -> Result<Vec<StarRecord>, ApiError> {
    let success = payload.get("status").and_then(Value::as_str) == Some("success");
    match (success, payload.get("data").and_then(Value::as_array)) {
        (true, Some(rows)) => Ok(map_stars(rows)),
        _ => {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Failed to fetch stars")
                .to_string();
            Err(ApiError::Malformed(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_without_any_identifier_degrades_to_sentinels() {
        let rec = StarRecord::from_raw(json!({"Vmag": 9.0}));
        assert_eq!(rec.id, UNKNOWN);
        assert!(rec.name.starts_with("Star"));
        assert_eq!(rec.spectral_type, UNKNOWN);
        assert_eq!(rec.magnitude, Some(9.0));
        assert_eq!(rec.distance_label(), "N/A");
    }

    #[test]
    fn primary_identifier_beats_secondary() {
        let rec = StarRecord::from_raw(json!({"ID": "TIC42", "tid": 99, "GAIA": "G7"}));
        assert_eq!(rec.id, "TIC42");
        assert_eq!(rec.name, "TIC42");

        let rec = StarRecord::from_raw(json!({"tid": 99, "GAIA": "G7"}));
        assert_eq!(rec.id, "99");
        assert_eq!(rec.name, "Star 99");
    }

    #[test]
    fn magnitude_priority_order() {
        let rec = StarRecord::from_raw(json!({"GAIAmag": 8.0, "Vmag": 7.0, "Tmag": 9.1}));
        assert_eq!(rec.magnitude, Some(9.1));
        let rec = StarRecord::from_raw(json!({"Vmag": 7.0, "GAIAmag": 8.0}));
        assert_eq!(rec.magnitude, Some(8.0));
    }

    #[test]
    fn search_row_shapes_like_the_ui_expects() {
        let rec = StarRecord::from_raw(json!({"ID": "TIC1", "Tmag": 9.1}));
        assert_eq!(rec.id, "TIC1");
        assert_eq!(rec.name, "TIC1");
        assert_eq!(rec.spectral_type, UNKNOWN);
        assert_eq!(rec.magnitude, Some(9.1));
        assert_eq!(rec.magnitude_label(), "9.1");
        assert_eq!(rec.distance_label(), "N/A");
        // raw row preserved alongside the derived fields
        assert_eq!(rec.raw["ID"], "TIC1");
        assert_eq!(rec.raw["Tmag"], 9.1);
    }

    #[test]
    fn coordinates_prefer_degrees_then_convert_radians() {
        let rec = StarRecord::from_raw(json!({"ra": 120.5, "dec": -10.25}));
        assert_eq!(rec.ra_deg(), Some(120.5));
        assert_eq!(rec.dec_deg(), Some(-10.25));

        let rec = StarRecord::from_raw(json!({
            "RA_orig": std::f64::consts::PI,
            "Dec_orig": -std::f64::consts::FRAC_PI_2,
        }));
        assert!((rec.ra_deg().unwrap() - 180.0).abs() < 1e-9);
        assert!((rec.dec_deg().unwrap() + 90.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_candidates_follow_the_alias_chain() {
        let rec = StarRecord::from_raw(json!({
            "GAIA": "G1",
            "TWOMASS": "J1234",
            "tid": 7,
        }));
        assert_eq!(rec.analyze_id_candidates(), vec!["7", "G1", "J1234"]);
    }

    #[test]
    fn search_envelope_success_and_failure() {
        let ok = shape_search_response(json!({
            "status": "success",
            "data": [{"ID": "TIC1", "Tmag": 9.1}],
        }))
        .unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].id, "TIC1");

        let err = shape_search_response(json!({"status": "error", "message": "boom"}));
        assert_eq!(err.unwrap_err(), ApiError::Malformed("boom".to_string()));
    }

    #[test]
    fn empty_row_list_yields_empty_output() {
        let stars = shape_search_response(json!({"status": "success", "data": []})).unwrap();
        assert!(stars.is_empty());
    }
}
