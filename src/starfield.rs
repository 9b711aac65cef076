//! All-sky starfield view.
//!
//! Projects catalog stars onto the celestial sphere and renders them as an
//! orbitable point field: drag to rotate (with inertia), scroll to change
//! the field of view, hover for a label, click to select. The externally
//! selected star is marked with a highlight ring that tracks selection
//! changes without rebuilding the scene.

use eframe::{egui, egui_glow};
use egui::mutex::Mutex;
use egui_plot::{MarkerShape, Plot, PlotBounds, PlotPoint, PlotPoints, Points, PlotTransform};
use nalgebra::{Matrix3, Vector3};
use std::sync::Arc;

use crate::catalog::StarRecord;
use crate::math::{project, rotation_from_drag, unit_from_ra_dec};
use crate::scene::SceneHost;
use crate::sky::SkyRenderer;

const MIN_FOV_DEG: f64 = 20.0;
const MAX_FOV_DEG: f64 = 90.0;
const FOV_STEP_DEG: f64 = 2.5;
const DEFAULT_MAGNITUDE: f64 = 12.0;
/// Pointer displacement below this is a click, above it a drag.
const CLICK_SLOP_PX_SQ: f32 = 9.0;
const PICK_RADIUS_PX: f32 = 8.0;
const DRAG_DAMPING: f32 = 0.92;

pub struct StarPoint {
    pub direction: Vector3<f64>,
    pub color: egui::Color32,
    pub radius: f32,
    pub record_idx: usize,
}

pub struct StarfieldScene {
    pub points: Vec<StarPoint>,
}

/// Star color from effective temperature: blue-hot through white to red-cool.
pub fn temperature_color(teff_k: Option<f64>) -> egui::Color32 {
    match teff_k {
        Some(teff) => {
            let t = ((teff - 2500.0) / 7500.0).clamp(0.0, 1.0);
            let r = 1.0 - t * 0.6;
            let g = 0.8 * (1.0 - (t - 0.5).abs() * 2.0);
            let b = 0.9 * t + 0.1;
            egui::Color32::from_rgb(
                (r * 255.0) as u8,
                (g * 255.0) as u8,
                (b * 255.0) as u8,
            )
        }
        None => egui::Color32::WHITE,
    }
}

/// Point radius from apparent magnitude; brighter stars draw larger.
pub fn radius_from_magnitude(magnitude: Option<f64>) -> f32 {
    let mag = magnitude.unwrap_or(DEFAULT_MAGNITUDE);
    let rel = 10f64.powf(-0.4 * (mag - 10.0));
    (1.0 + (rel * 3.0).min(4.0)) as f32
}

/// Build the point field from catalog records. Rows without resolvable
/// coordinates are skipped; `record_idx` keeps the link back to the row.
pub fn build_scene(records: &[StarRecord]) -> Result<StarfieldScene, String> {
    let points = records
        .iter()
        .enumerate()
        .filter_map(|(record_idx, record)| {
            let ra = record.ra_deg()?;
            let dec = record.dec_deg()?;
            Some(StarPoint {
                direction: unit_from_ra_dec(ra, dec),
                color: temperature_color(record.teff_k()),
                radius: radius_from_magnitude(record.magnitude),
                record_idx,
            })
        })
        .collect();
    Ok(StarfieldScene { points })
}

struct ProjectedStar {
    record_idx: usize,
    point: [f64; 2],
    color: egui::Color32,
    radius: f32,
}

pub struct StarfieldView {
    pub rotation: Matrix3<f64>,
    pub fov_deg: f64,
    pub scene: SceneHost<StarfieldScene>,
    drag_velocity: egui::Vec2,
    press_pos: Option<egui::Pos2>,
}

impl StarfieldView {
    pub fn new() -> Self {
        Self {
            rotation: Matrix3::identity(),
            fov_deg: 60.0,
            scene: SceneHost::new(),
            drag_velocity: egui::Vec2::ZERO,
            press_pos: None,
        }
    }

    /// Draw one frame; returns the picked record index on a qualifying click.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        width: f32,
        height: f32,
        records: &[StarRecord],
        selected: Option<&StarRecord>,
        time: f64,
        sky: Option<&Arc<Mutex<SkyRenderer>>>,
    ) -> Option<usize> {
        let margin = (self.fov_deg.to_radians() * 0.5).tan();
        let rect = egui::Rect::from_min_size(ui.cursor().min, egui::Vec2::new(width, height));

        if let Some(renderer) = sky {
            let renderer = renderer.clone();
            let inv_rotation = self.rotation.transpose();
            let aspect = width / height.max(1.0);
            let tan_half_fov = margin as f32;
            let callback = egui::PaintCallback {
                rect,
                callback: Arc::new(egui_glow::CallbackFn::new(move |_info, painter| {
                    let gl = painter.gl();
                    renderer.lock().paint(gl, &inv_rotation, aspect, tan_half_fov);
                })),
            };
            ui.painter().add(callback);
        }

        let projected: Vec<ProjectedStar> = self
            .scene
            .ready()
            .map(|scene| {
                scene
                    .points
                    .iter()
                    .filter_map(|star| {
                        let (x, y) = project(&self.rotation, &star.direction)?;
                        let twinkle =
                            1.0 + 0.18 * (time * 2.1 + star.record_idx as f64 * 1.7).sin();
                        Some(ProjectedStar {
                            record_idx: star.record_idx,
                            point: [x, y],
                            color: star.color,
                            radius: star.radius * twinkle as f32,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let highlight = selected.and_then(|record| {
            let direction = unit_from_ra_dec(record.ra_deg()?, record.dec_deg()?);
            let (x, y) = project(&self.rotation, &direction)?;
            Some([x, y])
        });

        let plot = Plot::new("starfield")
            .data_aspect(1.0)
            .width(width)
            .height(height)
            .show_axes(false)
            .show_grid(false)
            .show_x(false)
            .show_y(false)
            .show_background(sky.is_none())
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .cursor_color(egui::Color32::TRANSPARENT);

        let response = plot.show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                [-margin, -margin],
                [margin, margin],
            ));
            for star in &projected {
                plot_ui.points(
                    Points::new("", PlotPoints::new(vec![star.point]))
                        .radius(star.radius)
                        .color(star.color)
                        .filled(true),
                );
            }
            if let Some(point) = highlight {
                plot_ui.points(
                    Points::new("", PlotPoints::new(vec![point]))
                        .shape(MarkerShape::Circle)
                        .radius(9.0)
                        .filled(false)
                        .color(egui::Color32::from_rgb(255, 255, 170)),
                );
            }
        });

        let resp = &response.response;

        if resp.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.fov_deg = (self.fov_deg - f64::from(scroll.signum()) * FOV_STEP_DEG)
                    .clamp(MIN_FOV_DEG, MAX_FOV_DEG);
            }
        }

        let sensitivity = self.fov_deg.to_radians() / f64::from(height.max(1.0));
        if resp.dragged() {
            let delta = resp.drag_delta();
            self.drag_velocity = delta;
            self.rotation = rotation_from_drag(
                f64::from(delta.x) * sensitivity,
                f64::from(delta.y) * sensitivity,
            ) * self.rotation;
        } else if self.drag_velocity.length() > 0.05 {
            self.drag_velocity *= DRAG_DAMPING;
            self.rotation = rotation_from_drag(
                f64::from(self.drag_velocity.x) * sensitivity,
                f64::from(self.drag_velocity.y) * sensitivity,
            ) * self.rotation;
        } else {
            self.drag_velocity = egui::Vec2::ZERO;
        }

        if resp.is_pointer_button_down_on() && self.press_pos.is_none() {
            self.press_pos = resp.interact_pointer_pos();
        }

        let mut picked = None;
        if resp.clicked() {
            let within_slop = match (self.press_pos, resp.interact_pointer_pos()) {
                (Some(origin), Some(pos)) => (pos - origin).length_sq() <= CLICK_SLOP_PX_SQ,
                _ => true,
            };
            if within_slop {
                if let Some(pointer) = resp.interact_pointer_pos() {
                    picked = nearest_within(&projected, &response.transform, pointer, PICK_RADIUS_PX)
                        .filter(|idx| *idx < records.len());
                }
            }
        }
        if !ui.input(|i| i.pointer.any_down()) {
            self.press_pos = None;
        }

        if let Some(hover) = resp.hover_pos() {
            if let Some(idx) = nearest_within(&projected, &response.transform, hover, PICK_RADIUS_PX)
            {
                if let Some(record) = records.get(idx) {
                    ui.painter().text(
                        hover + egui::vec2(12.0, -12.0),
                        egui::Align2::LEFT_BOTTOM,
                        format!("{} (mag {})", record.name, record.magnitude_label()),
                        egui::FontId::proportional(12.0),
                        egui::Color32::WHITE,
                    );
                }
            }
        }

        if self.scene.is_building() {
            ui.put(
                egui::Rect::from_center_size(rect.center(), egui::vec2(24.0, 24.0)),
                egui::Spinner::new().size(24.0),
            );
        } else if let Some(error) = self.scene.error() {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("Starfield unavailable: {error}"),
                egui::FontId::proportional(13.0),
                egui::Color32::from_rgb(255, 107, 107),
            );
        } else if projected.is_empty() && records.is_empty() {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Run a filter search to populate the sky",
                egui::FontId::proportional(13.0),
                egui::Color32::from_gray(140),
            );
        }

        picked
    }
}

fn nearest_within(
    projected: &[ProjectedStar],
    transform: &PlotTransform,
    pointer: egui::Pos2,
    max_px: f32,
) -> Option<usize> {
    let mut best: Option<(f32, usize)> = None;
    for star in projected {
        let screen = transform.position_from_point(&PlotPoint::new(star.point[0], star.point[1]));
        let dist = screen.distance(pointer);
        if dist <= max_px && best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, star.record_idx));
        }
    }
    best.map(|(_, idx)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scene_skips_rows_without_coordinates() {
        let records = vec![
            StarRecord::from_raw(json!({"ID": "A", "ra": 10.0, "dec": 5.0, "Teff": 5800})),
            StarRecord::from_raw(json!({"ID": "B"})),
            StarRecord::from_raw(json!({"ID": "C", "ra": 200.0, "dec": -45.0})),
        ];
        let scene = build_scene(&records).unwrap();
        assert_eq!(scene.points.len(), 2);
        assert_eq!(scene.points[0].record_idx, 0);
        assert_eq!(scene.points[1].record_idx, 2);
    }

    #[test]
    fn brighter_stars_draw_larger() {
        let bright = radius_from_magnitude(Some(2.0));
        let faint = radius_from_magnitude(Some(14.0));
        let unknown = radius_from_magnitude(None);
        assert!(bright > faint);
        assert!(unknown > 0.0);
    }

    #[test]
    fn temperature_gradient_runs_red_to_blue() {
        let cool = temperature_color(Some(2500.0));
        let hot = temperature_color(Some(10000.0));
        assert!(cool.r() > hot.r());
        assert!(hot.b() > cool.b());
        assert_eq!(temperature_color(None), egui::Color32::WHITE);
    }
}
