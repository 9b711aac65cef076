//! Viewer state and panel rendering.
//!
//! Owns the ViewerState struct (sidebar tabs, star lists, analyze
//! parameters, in-flight request channels) and renders the sidebar, the
//! results panel, and the overlay windows. Worker-thread results are
//! drained here each frame, fenced by request tokens.

use eframe::egui;
use egui::mutex::Mutex;
use std::sync::{mpsc, Arc};

use crate::analysis::AnalysisOutcome;
use crate::api::{AnalyzeRequest, ApiClient, ApiError, Mission, Optimization, RequestGate};
use crate::catalog::{StarRecord, UNKNOWN};
use crate::filters::SearchFilters;
use crate::hyperparams::HyperParams;
use crate::results::{self, VisualizationGallery};
use crate::sky::SkyRenderer;
use crate::starfield::{self, StarfieldView};
use crate::system_view::SystemView;

const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 107, 107);

type SearchMessage = (u64, Result<Vec<StarRecord>, ApiError>);
type AnalyzeMessage = (u64, Result<AnalysisOutcome, ApiError>);

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum SidebarTab {
    Stars,
    Search,
    Filters,
}

pub(crate) struct ViewerState {
    pub(crate) api: ApiClient,
    pub(crate) active_tab: SidebarTab,
    pub(crate) basic_stars: Vec<StarRecord>,
    pub(crate) filters: SearchFilters,
    pub(crate) filter_error: Option<String>,
    pub(crate) stars: Vec<StarRecord>,
    pub(crate) selected: Option<StarRecord>,
    pub(crate) star_id_input: String,
    pub(crate) mission: Mission,
    pub(crate) oi_lookup: bool,
    pub(crate) optimization: Optimization,
    pub(crate) model_name: String,
    pub(crate) hyper: HyperParams,
    pub(crate) show_hyper: bool,
    pub(crate) searching: bool,
    pub(crate) search_gate: RequestGate,
    pub(crate) search_tx: mpsc::Sender<SearchMessage>,
    search_rx: mpsc::Receiver<SearchMessage>,
    pub(crate) analyzing: bool,
    pub(crate) analyze_gate: RequestGate,
    pub(crate) analyze_tx: mpsc::Sender<AnalyzeMessage>,
    analyze_rx: mpsc::Receiver<AnalyzeMessage>,
    pub(crate) analysis: Option<AnalysisOutcome>,
    pub(crate) analyze_error: Option<String>,
    pub(crate) show_results: bool,
    pub(crate) starfield: StarfieldView,
    pub(crate) system: SystemView,
    pub(crate) gallery: VisualizationGallery,
    upload_tx: mpsc::Sender<Result<String, ApiError>>,
    upload_rx: mpsc::Receiver<Result<String, ApiError>>,
    pub(crate) upload_status: Option<String>,
    pub(crate) session_started: chrono::DateTime<chrono::Utc>,
    pub(crate) started: std::time::Instant,
}

/// Quick-pick list of well-known targets shown before any search.
fn builtin_stars() -> Vec<StarRecord> {
    let rows: [(&str, &str, &str, f64); 8] = [
        ("388857263", "Proxima Centauri", "Red Dwarf", 11.13),
        ("261136679", "π Mensae", "G-type", 5.65),
        ("150428135", "TOI-700", "Red Dwarf", 13.1),
        ("260128333", "TOI-1338", "SB", 12.537),
        ("251848941", "TOI-178", "PM", 13.05),
        ("350810590", "Kepler-36", "Eruptive", 12.795),
        ("245873777", "Aldebaran", "Red Giant", 0.85),
        ("423088367", "Pollux", "K-type Giant", 1.14),
    ];
    rows.iter()
        .map(|(id, name, kind, mag)| StarRecord {
            id: id.to_string(),
            name: name.to_string(),
            spectral_type: kind.to_string(),
            magnitude: Some(*mag),
            distance_pc: None,
            raw: serde_json::json!({ "ID": id }),
        })
        .collect()
}

/// Identifiers to try for analysis: an explicit input wins, otherwise the
/// selected star's alias chain.
pub(crate) fn resolve_analyze_ids(input: &str, selected: Option<&StarRecord>) -> Vec<String> {
    let input = input.trim();
    if !input.is_empty() {
        return vec![input.to_string()];
    }
    selected
        .map(|record| record.analyze_id_candidates())
        .unwrap_or_default()
}

fn star_list(
    ui: &mut egui::Ui,
    records: &[StarRecord],
    selected_id: Option<&str>,
) -> Option<usize> {
    let mut clicked = None;
    for (index, record) in records.iter().enumerate() {
        let is_selected = selected_id == Some(record.id.as_str());
        let mut text = format!(
            "{}\n{} · {} · mag {}",
            record.name,
            record.id,
            record.spectral_type,
            record.magnitude_label()
        );
        if record.distance_pc.is_some() {
            text.push_str(&format!(" · {}", record.distance_label()));
        }
        if ui.selectable_label(is_selected, text).clicked() {
            clicked = Some(index);
        }
    }
    clicked
}

impl ViewerState {
    pub(crate) fn new() -> Self {
        let (search_tx, search_rx) = mpsc::channel();
        let (analyze_tx, analyze_rx) = mpsc::channel();
        let (upload_tx, upload_rx) = mpsc::channel();
        Self {
            api: ApiClient::from_env(),
            active_tab: SidebarTab::Stars,
            basic_stars: builtin_stars(),
            filters: SearchFilters::default(),
            filter_error: None,
            stars: Vec::new(),
            selected: None,
            star_id_input: String::new(),
            mission: Mission::Tess,
            oi_lookup: true,
            optimization: Optimization::Balanced,
            model_name: "default_model".to_string(),
            hyper: HyperParams::default(),
            show_hyper: false,
            searching: false,
            search_gate: RequestGate::new(),
            search_tx,
            search_rx,
            analyzing: false,
            analyze_gate: RequestGate::new(),
            analyze_tx,
            analyze_rx,
            analysis: None,
            analyze_error: None,
            show_results: false,
            starfield: StarfieldView::new(),
            system: SystemView::new(),
            gallery: VisualizationGallery::new(),
            upload_tx,
            upload_rx,
            upload_status: None,
            session_started: chrono::Utc::now(),
            started: std::time::Instant::now(),
        }
    }

    /// Drain worker-thread results. Stale tokens are dropped so overlapping
    /// requests settle on the most recently issued one regardless of
    /// arrival order.
    pub(crate) fn drain_results(&mut self) {
        while let Ok((token, result)) = self.search_rx.try_recv() {
            if !self.search_gate.is_current(token) {
                continue;
            }
            self.searching = false;
            match result {
                Ok(stars) => {
                    self.filter_error = if stars.is_empty() {
                        Some(
                            "No stars found matching the criteria. Try adjusting your filters."
                                .to_string(),
                        )
                    } else {
                        None
                    };
                    self.stars = stars;
                    let records = self.stars.clone();
                    self.starfield
                        .scene
                        .rebuild(move || starfield::build_scene(&records));
                }
                Err(e) => {
                    log::warn!("search failed: {e}");
                    self.filter_error = Some(e.to_string());
                    self.stars.clear();
                    self.starfield.scene.teardown();
                }
            }
        }

        while let Ok((token, result)) = self.analyze_rx.try_recv() {
            if !self.analyze_gate.is_current(token) {
                continue;
            }
            self.analyzing = false;
            match result {
                Ok(outcome) => {
                    self.analysis = Some(outcome);
                    self.analyze_error = None;
                    self.show_results = true;
                    self.gallery.reset();
                }
                Err(e) => {
                    log::warn!("analyze failed: {e}");
                    self.analyze_error = Some(e.to_string());
                }
            }
        }

        while let Ok(result) = self.upload_rx.try_recv() {
            self.upload_status = Some(match result {
                Ok(ack) => {
                    let ack: String = ack.chars().take(80).collect();
                    format!("Upload accepted: {ack}")
                }
                Err(e) => format!("Upload failed: {e}"),
            });
        }

        self.starfield.scene.poll();
    }

    pub(crate) fn start_search(&mut self) {
        if let Err(e) = self.filters.validate() {
            self.filter_error = Some(e);
            return;
        }
        self.filter_error = None;
        self.searching = true;
        let token = self.search_gate.issue();
        let api = self.api.clone();
        let filters = self.filters.clone();
        let tx = self.search_tx.clone();
        std::thread::spawn(move || {
            let _ = tx.send((token, api.search_stars(&filters)));
        });
    }

    pub(crate) fn start_analyze(&mut self) {
        let ids = resolve_analyze_ids(&self.star_id_input, self.selected.as_ref());
        if ids.is_empty() {
            self.analyze_error = Some("Select a star first.".to_string());
            return;
        }
        self.analyze_error = None;
        self.analyzing = true;
        let token = self.analyze_gate.issue();
        let api = self.api.clone();
        let tx = self.analyze_tx.clone();
        let mut request = AnalyzeRequest::new(ids[0].clone());
        request.mission = self.mission;
        request.oi_lookup = self.oi_lookup;
        request.optimization = self.optimization;
        request.model_name = self.model_name.clone();
        std::thread::spawn(move || {
            // try each identifier until one succeeds
            let mut last = Err(ApiError::EmptyResponse);
            for id in ids {
                let mut attempt = request.clone();
                attempt.id = id;
                last = api.analyze_star(&attempt);
                if last.is_ok() {
                    break;
                }
            }
            let _ = tx.send((token, last));
        });
    }

    pub(crate) fn start_upload(&mut self, path: std::path::PathBuf) {
        self.upload_status = Some(format!("Uploading {}...", path.display()));
        let api = self.api.clone();
        let tx = self.upload_tx.clone();
        std::thread::spawn(move || {
            let _ = tx.send(api.upload_data_file(&path));
        });
    }

    fn select_record(&mut self, record: StarRecord) {
        self.star_id_input = if record.id != UNKNOWN {
            record.id.clone()
        } else {
            String::new()
        };
        self.selected = Some(record);
    }

    pub(crate) fn side_panel(&mut self, ui: &mut egui::Ui) {
        if self.show_results {
            self.results_panel(ui);
            return;
        }

        ui.horizontal(|ui| {
            for (tab, label) in [
                (SidebarTab::Stars, "Stars"),
                (SidebarTab::Search, "Search"),
                (SidebarTab::Filters, "Filters"),
            ] {
                if ui.selectable_label(self.active_tab == tab, label).clicked() {
                    self.active_tab = tab;
                }
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .id_salt("sidebar_scroll")
            .show(ui, |ui| match self.active_tab {
                SidebarTab::Stars => self.stars_tab(ui),
                SidebarTab::Search => self.search_tab(ui),
                SidebarTab::Filters => self.filters_tab(ui),
            });

        ui.separator();
        self.analyze_controls(ui);
    }

    fn stars_tab(&mut self, ui: &mut egui::Ui) {
        let selected_id = self.selected.as_ref().map(|s| s.id.clone());
        if let Some(index) = star_list(ui, &self.basic_stars, selected_id.as_deref()) {
            let record = self.basic_stars[index].clone();
            self.select_record(record);
        }
    }

    fn search_tab(&mut self, ui: &mut egui::Ui) {
        ui.label("Telescope");
        egui::ComboBox::from_id_salt("mission_combo")
            .selected_text(self.mission.label())
            .show_ui(ui, |ui| {
                for mission in Mission::ALL {
                    ui.selectable_value(&mut self.mission, mission, mission.label());
                }
            });

        ui.label("Star ID");
        ui.text_edit_singleline(&mut self.star_id_input);

        ui.checkbox(&mut self.oi_lookup, "TOI/KOI lookup");

        ui.label("Optimization");
        egui::ComboBox::from_id_salt("optimization_combo")
            .selected_text(self.optimization.label())
            .show_ui(ui, |ui| {
                for optimization in Optimization::ALL {
                    ui.selectable_value(&mut self.optimization, optimization, optimization.label());
                }
            });

        ui.label("Model name");
        ui.text_edit_singleline(&mut self.model_name);

        ui.separator();
        egui::CollapsingHeader::new("Light-curve upload").show(ui, |ui| {
            if ui.button("Upload CSV/JSON/FITS").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Light curve", &["csv", "json", "fits"])
                    .pick_file()
                {
                    self.start_upload(path);
                }
            }
            if let Some(status) = &self.upload_status {
                ui.weak(status);
            }
        });
    }

    fn filters_tab(&mut self, ui: &mut egui::Ui) {
        ui.label("Sky position");
        ui.horizontal(|ui| {
            ui.label("RA:");
            ui.add(
                egui::DragValue::new(&mut self.filters.ra)
                    .range(0.0..=359.99)
                    .speed(0.5)
                    .suffix("°"),
            );
            ui.label("Dec:");
            ui.add(
                egui::DragValue::new(&mut self.filters.dec)
                    .range(-90.0..=90.0)
                    .speed(0.5)
                    .suffix("°"),
            );
            ui.label("R:");
            ui.add(
                egui::DragValue::new(&mut self.filters.radius_arcmin)
                    .range(0.01..=30.0)
                    .speed(0.5)
                    .suffix("'"),
            );
        });

        ui.label("Magnitude range");
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut self.filters.mag_min).range(0.0..=20.0).speed(0.1));
            ui.label("to");
            ui.add(egui::DragValue::new(&mut self.filters.mag_max).range(0.0..=20.0).speed(0.1));
        });

        ui.label("Temperature (K)");
        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(&mut self.filters.temp_min)
                    .range(2500.0..=40000.0)
                    .speed(50.0),
            );
            ui.label("to");
            ui.add(
                egui::DragValue::new(&mut self.filters.temp_max)
                    .range(2500.0..=40000.0)
                    .speed(50.0),
            );
        });

        ui.label("Distance (pc)");
        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(&mut self.filters.dist_min)
                    .range(1.0..=10000.0)
                    .speed(10.0),
            );
            ui.label("to");
            ui.add(
                egui::DragValue::new(&mut self.filters.dist_max)
                    .range(1.0..=10000.0)
                    .speed(10.0),
            );
        });

        ui.label("Observation");
        let obs_label = match self.filters.observatory.as_str() {
            "" => "Any",
            "tess" => "TESS",
            "k2" => "K2",
            other => other,
        };
        egui::ComboBox::from_id_salt("obs_combo")
            .selected_text(obs_label)
            .show_ui(ui, |ui| {
                for (value, label) in [("", "Any"), ("tess", "TESS"), ("k2", "K2")] {
                    if ui
                        .selectable_label(self.filters.observatory == value, label)
                        .clicked()
                    {
                        self.filters.observatory = value.to_string();
                    }
                }
            });

        let button_label = if self.searching { "Filtering..." } else { "Filter" };
        if ui
            .add_enabled(!self.searching, egui::Button::new(button_label))
            .clicked()
        {
            self.start_search();
        }
        if let Some(error) = &self.filter_error {
            ui.colored_label(ERROR_COLOR, error);
        }

        ui.separator();
        ui.label("Select star");
        if self.stars.is_empty() {
            ui.weak("No stars found. Apply filters and click \"Filter\".");
        } else {
            let selected_id = self.selected.as_ref().map(|s| s.id.clone());
            if let Some(index) = star_list(ui, &self.stars, selected_id.as_deref()) {
                let record = self.stars[index].clone();
                self.select_record(record);
            }
        }
    }

    fn analyze_controls(&mut self, ui: &mut egui::Ui) {
        let can_analyze =
            !resolve_analyze_ids(&self.star_id_input, self.selected.as_ref()).is_empty();
        let label = if self.analyzing {
            "Analyzing..."
        } else if can_analyze {
            "Analyze selected star"
        } else {
            "Select a star to analyze"
        };
        if ui
            .add_enabled(can_analyze && !self.analyzing, egui::Button::new(label))
            .clicked()
        {
            self.start_analyze();
        }
        if let Some(error) = &self.analyze_error {
            ui.colored_label(ERROR_COLOR, error);
        }
        if ui.button("Hyper parameters").clicked() {
            self.show_hyper = !self.show_hyper;
        }
    }

    fn results_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong("Star Analysis Results");
            if ui.button("← Back to search").clicked() {
                self.show_results = false;
            }
        });
        ui.separator();

        let Some(outcome) = &self.analysis else {
            ui.spinner();
            ui.label("Analyzing star data...");
            return;
        };
        let report = &outcome.report;
        let gallery = &mut self.gallery;
        egui::ScrollArea::vertical()
            .id_salt("results_scroll")
            .show(ui, |ui| {
                results::star_info_grid(ui, &report.star);
                ui.separator();
                gallery.show(ui, report);
            });
    }

    /// Central 3D area: the starfield, or the planetary system once an
    /// analysis is shown.
    pub(crate) fn central_view(
        &mut self,
        ui: &mut egui::Ui,
        sky: Option<&Arc<Mutex<SkyRenderer>>>,
    ) {
        let rect = ui.available_rect_before_wrap();
        let time = self.started.elapsed().as_secs_f64();

        if self.show_results {
            if let Some(outcome) = &self.analysis {
                self.system
                    .show(ui, rect.width(), rect.height(), &outcome.summary, time);
                return;
            }
        }

        let picked = self.starfield.show(
            ui,
            rect.width(),
            rect.height(),
            &self.stars,
            self.selected.as_ref(),
            time,
            sky,
        );
        if let Some(index) = picked {
            if let Some(record) = self.stars.get(index).cloned() {
                self.select_record(record);
            }
        }
    }

    pub(crate) fn overlay_windows(&mut self, ctx: &egui::Context) {
        if self.show_hyper {
            let mut open = true;
            let mut train = false;
            let hyper = &mut self.hyper;
            egui::Window::new("Hyper parameters")
                .open(&mut open)
                .default_width(320.0)
                .show(ctx, |ui| {
                    train = hyper.show(ui);
                });
            self.show_hyper = open;
            if train {
                let body = self.hyper.request_body();
                log::info!("training configuration assembled: {body}");
                self.upload_status = Some("Training configuration assembled".to_string());
            }
        }

        if self.show_results {
            if let Some(outcome) = &self.analysis {
                egui::Window::new("AI Analysis")
                    .default_width(300.0)
                    .show(ctx, |ui| {
                        results::model_panel(ui, &outcome.report.model);
                    });
                egui::Window::new("Transit Details")
                    .default_width(260.0)
                    .show(ctx, |ui| {
                        results::transit_panel(ui, &outcome.summary.transits);
                    });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::shape_analyze_response;
    use serde_json::json;

    fn sample_outcome(id: &str) -> AnalysisOutcome {
        shape_analyze_response(json!({ "ID": id })).unwrap()
    }

    #[test]
    fn builtin_list_holds_the_eight_quick_picks() {
        let stars = builtin_stars();
        assert_eq!(stars.len(), 8);
        assert_eq!(stars[0].name, "Proxima Centauri");
        assert_eq!(stars[0].analyze_id_candidates(), vec!["388857263"]);
    }

    #[test]
    fn explicit_input_wins_over_selection() {
        let record = StarRecord::from_raw(json!({"ID": "TIC9"}));
        let ids = resolve_analyze_ids("  TIC1  ", Some(&record));
        assert_eq!(ids, vec!["TIC1"]);
        let ids = resolve_analyze_ids("", Some(&record));
        assert_eq!(ids, vec!["TIC9"]);
        assert!(resolve_analyze_ids("", None).is_empty());
    }

    #[test]
    fn stale_analyze_response_is_discarded_when_it_arrives_late() {
        let mut viewer = ViewerState::new();
        let first = viewer.analyze_gate.issue();
        let second = viewer.analyze_gate.issue();
        viewer.analyzing = true;

        viewer
            .analyze_tx
            .send((second, Ok(sample_outcome("TIC-B"))))
            .unwrap();
        viewer
            .analyze_tx
            .send((first, Ok(sample_outcome("TIC-A"))))
            .unwrap();
        viewer.drain_results();

        let analysis = viewer.analysis.expect("current response applied");
        assert_eq!(analysis.summary.star_id, "TIC-B");
        assert!(!viewer.analyzing);
    }

    #[test]
    fn stale_analyze_response_is_discarded_when_it_arrives_first() {
        let mut viewer = ViewerState::new();
        let first = viewer.analyze_gate.issue();
        let second = viewer.analyze_gate.issue();

        viewer
            .analyze_tx
            .send((first, Ok(sample_outcome("TIC-A"))))
            .unwrap();
        viewer
            .analyze_tx
            .send((second, Ok(sample_outcome("TIC-B"))))
            .unwrap();
        viewer.drain_results();

        assert_eq!(viewer.analysis.unwrap().summary.star_id, "TIC-B");
    }

    #[test]
    fn failed_search_clears_the_list_and_keeps_the_message() {
        let mut viewer = ViewerState::new();
        viewer.stars = vec![StarRecord::from_raw(json!({"ID": "OLD"}))];
        let token = viewer.search_gate.issue();
        viewer.searching = true;
        viewer
            .search_tx
            .send((
                token,
                Err(ApiError::Status {
                    status: 500,
                    message: "backend down".to_string(),
                }),
            ))
            .unwrap();
        viewer.drain_results();
        assert!(viewer.stars.is_empty());
        assert!(viewer.filter_error.as_ref().unwrap().contains("backend down"));
        assert!(!viewer.searching);
    }
}
