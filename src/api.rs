//! Backend HTTP client.
//!
//! Wraps blocking ureq calls against the analysis service: star search,
//! transit analysis, and light-curve uploads. Callers run these on worker
//! threads and ship results back over mpsc channels; every failure is
//! classified into an `ApiError` value so the UI can render it inline.

use serde_json::Value;
use std::path::Path;

use crate::analysis::{self, AnalysisOutcome};
use crate::catalog::{self, StarRecord};
use crate::filters::SearchFilters;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const BASE_URL_ENV: &str = "EXO_VIZ_API_URL";

const MULTIPART_BOUNDARY: &str = "----exo-viz-upload-7f3a29c1";

/// Failure taxonomy for every backend operation.
///
/// `Network` covers anything that never produced an HTTP response and maps
/// to the conventional status 0; `Status` carries the backend `message`
/// field when the body has one, else the status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Network(String),
    Status { status: u16, message: String },
    /// A 2xx response whose body held no usable record.
    EmptyResponse,
    /// A 2xx response whose body was not the expected shape.
    Malformed(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => 0,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {msg}"),
            ApiError::Status { status, message } => write!(f, "HTTP {status}: {message}"),
            ApiError::EmptyResponse => write!(f, "Empty analyze response"),
            ApiError::Malformed(msg) => write!(f, "Unexpected response: {msg}"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mission {
    Tess,
    Kepler,
}

impl Mission {
    pub const ALL: [Mission; 2] = [Mission::Tess, Mission::Kepler];

    pub fn label(&self) -> &'static str {
        match self {
            Mission::Tess => "TESS",
            Mission::Kepler => "Kepler",
        }
    }

    pub fn param(&self) -> &'static str {
        match self {
            Mission::Tess => "tess",
            Mission::Kepler => "kepler",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Optimization {
    Balanced,
    Precision,
    Recall,
}

impl Optimization {
    pub const ALL: [Optimization; 3] = [
        Optimization::Balanced,
        Optimization::Precision,
        Optimization::Recall,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Optimization::Balanced => "Balanced",
            Optimization::Precision => "Precision",
            Optimization::Recall => "Recall",
        }
    }

    pub fn param(&self) -> &'static str {
        match self {
            Optimization::Balanced => "balanced",
            Optimization::Precision => "precision",
            Optimization::Recall => "recall",
        }
    }
}

/// Parameters of one `/analyze` call.
#[derive(Clone, Debug)]
pub struct AnalyzeRequest {
    pub id: String,
    pub mission: Mission,
    pub oi_lookup: bool,
    pub optimization: Optimization,
    pub model_name: String,
}

impl AnalyzeRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mission: Mission::Tess,
            oi_lookup: true,
            optimization: Optimization::Balanced,
            model_name: "default_model".to_string(),
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("mission", self.mission.param().to_string()),
            ("oi_lookup", if self.oi_lookup { "1" } else { "0" }.to_string()),
            ("optimization_type", self.optimization.param().to_string()),
            ("model_name", self.model_name.clone()),
        ]
    }
}

/// Monotonic token issue/accept used to drop stale async responses.
///
/// Overlapping requests each carry their issue token; only the most
/// recently issued token is accepted, so a slow first response can never
/// overwrite the state of a later request.
pub struct RequestGate {
    latest: u64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self { latest: 0 }
    }

    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.latest
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /search` with the filter query, shaped into UI star records.
    pub fn search_stars(&self, filters: &SearchFilters) -> Result<Vec<StarRecord>, ApiError> {
        let payload = self.get_json("/search", &filters.query_params())?;
        catalog::shape_search_response(payload)
    }

    /// `GET /analyze` for one identifier, shaped into the results view-model.
    pub fn analyze_star(&self, request: &AnalyzeRequest) -> Result<AnalysisOutcome, ApiError> {
        let payload = self.get_json("/analyze", &request.params())?;
        analysis::shape_analyze_response(payload)
    }

    /// `POST /upload` with a multipart file body (CSV/JSON/FITS).
    /// The acknowledgement body is opaque and returned verbatim.
    pub fn upload_data_file(&self, path: &Path) -> Result<String, ApiError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ApiError::Network(format!("read {}: {e}", path.display())))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.dat");
        let body = multipart_body(filename, &bytes);
        let content_type = format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}");
        match ureq::post(&format!("{}/upload", self.base_url))
            .set("Content-Type", &content_type)
            .send_bytes(&body)
        {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| ApiError::Network(format!("read body: {e}"))),
            Err(e) => Err(classify(e)),
        }
    }

    fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let mut request = ureq::get(&format!("{}{}", self.base_url, path));
        for (key, value) in params {
            request = request.query(key, value);
        }
        match request.call() {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| ApiError::Network(format!("read body: {e}")))?;
                serde_json::from_str(&body).map_err(|e| ApiError::Malformed(format!("bad JSON: {e}")))
            }
            Err(e) => Err(classify(e)),
        }
    }
}

fn classify(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, resp) => {
            let status_text = resp.status_text().to_string();
            let message = resp
                .into_string()
                .ok()
                .and_then(|body| backend_message(&body))
                .unwrap_or(status_text);
            ApiError::Status { status, message }
        }
        ureq::Error::Transport(t) => ApiError::Network(t.to_string()),
    }
}

fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn multipart_body(filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_params_cover_the_full_query() {
        let mut request = AnalyzeRequest::new("TIC1");
        request.mission = Mission::Kepler;
        request.oi_lookup = false;
        request.optimization = Optimization::Precision;
        let params = request.params();
        assert_eq!(params[0], ("id", "TIC1".to_string()));
        assert_eq!(params[1], ("mission", "kepler".to_string()));
        assert_eq!(params[2], ("oi_lookup", "0".to_string()));
        assert_eq!(params[3], ("optimization_type", "precision".to_string()));
        assert_eq!(params[4], ("model_name", "default_model".to_string()));
    }

    #[test]
    fn analyze_defaults() {
        let request = AnalyzeRequest::new("x");
        assert_eq!(request.mission, Mission::Tess);
        assert!(request.oi_lookup);
        assert_eq!(request.optimization, Optimization::Balanced);
        assert_eq!(request.model_name, "default_model");
    }

    #[test]
    fn gate_accepts_only_the_latest_token() {
        let mut gate = RequestGate::new();
        let first = gate.issue();
        let second = gate.issue();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://example.test/");
        assert_eq!(client.base_url(), "http://example.test");
    }

    #[test]
    fn backend_message_prefers_message_field() {
        assert_eq!(
            backend_message(r#"{"message":"star not found"}"#),
            Some("star not found".to_string())
        );
        assert_eq!(backend_message("plain text"), None);
    }

    #[test]
    fn multipart_body_frames_the_file() {
        let body = multipart_body("lc.csv", b"a,b\n1,2\n");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with(&format!("--{MULTIPART_BOUNDARY}\r\n")));
        assert!(text.contains("filename=\"lc.csv\""));
        assert!(text.contains("a,b\n1,2\n"));
        assert!(text.ends_with(&format!("\r\n--{MULTIPART_BOUNDARY}--\r\n")));
    }
}
