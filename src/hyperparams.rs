//! Hyper-parameter panel for the server-side training job.
//!
//! The panel only assembles a configuration object; training itself runs on
//! the backend. Section layout and ranges follow the service defaults.

use eframe::egui;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub sigma_clip: f64,
    pub resample_cadence: u32,
    pub quality_mask: bool,
    pub period_max_days: u32,
    pub max_planets: u32,
    pub n_estimators: u32,
    pub learning_rate: f64,
    pub max_depth: u32,
    pub recall_focus: f64,
    pub precision_focus: f64,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            sigma_clip: 6.0,
            resample_cadence: 60,
            quality_mask: true,
            period_max_days: 365,
            max_planets: 4,
            n_estimators: 800,
            learning_rate: 0.07,
            max_depth: 4,
            recall_focus: 0.3,
            precision_focus: 0.7,
        }
    }
}

impl HyperParams {
    /// Configuration object submitted with a training request.
    pub fn request_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Draw the collapsible sections; returns true when "Train model"
    /// was clicked this frame.
    pub fn show(&mut self, ui: &mut egui::Ui) -> bool {
        egui::CollapsingHeader::new("Preprocessing")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Sigma-clip");
                    ui.add(egui::Slider::new(&mut self.sigma_clip, 1.0..=10.0));
                });
                ui.horizontal(|ui| {
                    ui.label("Resampling cadence");
                    ui.add(egui::Slider::new(&mut self.resample_cadence, 10..=100));
                });
                ui.checkbox(&mut self.quality_mask, "Quality mask");
            });

        egui::CollapsingHeader::new("Transit search")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Period range (days)");
                    ui.add(egui::Slider::new(&mut self.period_max_days, 1..=1000));
                });
                ui.horizontal(|ui| {
                    ui.label("Max planets");
                    ui.add(egui::Slider::new(&mut self.max_planets, 1..=10));
                });
            });

        egui::CollapsingHeader::new("Model")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("n_estimators");
                    ui.add(egui::Slider::new(&mut self.n_estimators, 100..=1000));
                });
                ui.horizontal(|ui| {
                    ui.label("learning_rate");
                    ui.add(egui::Slider::new(&mut self.learning_rate, 0.01..=1.0).step_by(0.01));
                });
                ui.horizontal(|ui| {
                    ui.label("max_depth");
                    ui.add(egui::Slider::new(&mut self.max_depth, 1..=10));
                });
            });

        egui::CollapsingHeader::new("Decision threshold")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Recall focus");
                    ui.add(egui::Slider::new(&mut self.recall_focus, 0.0..=1.0).step_by(0.1));
                });
                ui.horizontal(|ui| {
                    ui.label("Precision focus");
                    ui.add(egui::Slider::new(&mut self.precision_focus, 0.0..=1.0).step_by(0.1));
                });
            });

        ui.separator();
        ui.button("Train model").clicked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service() {
        let params = HyperParams::default();
        assert_eq!(params.sigma_clip, 6.0);
        assert_eq!(params.resample_cadence, 60);
        assert!(params.quality_mask);
        assert_eq!(params.n_estimators, 800);
        assert_eq!(params.learning_rate, 0.07);
        assert_eq!(params.max_depth, 4);
    }

    #[test]
    fn request_body_keeps_backend_field_names() {
        let body = HyperParams::default().request_body();
        assert_eq!(body["n_estimators"], 800);
        assert_eq!(body["learning_rate"], 0.07);
        assert_eq!(body["max_depth"], 4);
        assert_eq!(body["quality_mask"], true);
    }
}
