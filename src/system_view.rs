//! Planetary-system view for an analyzed star.
//!
//! Renders the host star and one orbiting body per transit entry: animated
//! orbital motion, hover labels, and click selection opening a detail
//! window. Without transit data a small demonstration system is shown.

use eframe::egui;
use egui_plot::{Line, Plot, PlotBounds, PlotPoint, PlotPoints, PlotTransform, Points};
use std::f64::consts::PI;

use crate::analysis::{AnalyzeSummary, TransitEntry};

const ORBIT_SEGMENTS: usize = 100;
const CLICK_SLOP_PX_SQ: f32 = 9.0;
const PICK_RADIUS_PX: f32 = 12.0;
/// Deterministic starting-phase spread between neighbouring orbits.
const PHASE_STEP_RAD: f64 = 2.399963;

pub struct PlanetBody {
    pub label: String,
    pub kind: String,
    pub period: String,
    pub depth: Option<String>,
    pub duration: Option<String>,
    pub orbit_radius: f64,
    pub angular_speed: f64,
    pub phase: f64,
    pub dot_radius: f32,
    pub color: egui::Color32,
}

/// Host-star color by effective temperature band.
pub fn star_color(teff_k: Option<f64>) -> egui::Color32 {
    let Some(teff) = teff_k else {
        return egui::Color32::from_rgb(0xff, 0xaa, 0x00);
    };
    if teff > 30000.0 {
        egui::Color32::from_rgb(0x9b, 0xb5, 0xff)
    } else if teff > 10000.0 {
        egui::Color32::from_rgb(0xff, 0xff, 0xff)
    } else if teff > 6000.0 {
        egui::Color32::from_rgb(0xff, 0xf4, 0xe6)
    } else if teff > 5000.0 {
        egui::Color32::from_rgb(0xff, 0xaa, 0x00)
    } else if teff > 3500.0 {
        egui::Color32::from_rgb(0xff, 0x66, 0x00)
    } else {
        egui::Color32::from_rgb(0xff, 0x00, 0x00)
    }
}

pub fn planet_color(kind: &str) -> egui::Color32 {
    match kind {
        "Terrestrial" => egui::Color32::from_rgb(0x8b, 0x45, 0x13),
        "Super-Earth" => egui::Color32::from_rgb(0x22, 0x8b, 0x22),
        "Mini-Neptune" => egui::Color32::from_rgb(0x41, 0x69, 0xe1),
        "Neptune-like" => egui::Color32::from_rgb(0x00, 0x00, 0xcd),
        "Gas Giant" => egui::Color32::from_rgb(0xff, 0xd7, 0x00),
        "Ice Giant" => egui::Color32::from_rgb(0x87, 0xce, 0xeb),
        _ => egui::Color32::from_rgb(0x80, 0x80, 0x80),
    }
}

fn planet_body(index: usize, kind: &str, radius_rel: f64, transit: TransitEntry) -> PlanetBody {
    PlanetBody {
        label: format!("Planet {}", index + 1),
        kind: kind.to_string(),
        period: transit.period,
        depth: transit.depth,
        duration: transit.duration,
        orbit_radius: 8.0 + index as f64 * 6.0,
        angular_speed: 0.3 + index as f64 * 0.12,
        phase: index as f64 * PHASE_STEP_RAD,
        dot_radius: ((radius_rel * 0.3).clamp(0.2, 1.5) * 10.0) as f32,
        color: planet_color(kind),
    }
}

pub fn planets_from_transits(transits: &[TransitEntry]) -> Vec<PlanetBody> {
    if transits.is_empty() {
        return demo_planets();
    }
    transits
        .iter()
        .enumerate()
        .map(|(index, transit)| planet_body(index, "Planet", 1.0, transit.clone()))
        .collect()
}

/// Placeholder system shown before any transit data exists.
fn demo_planets() -> Vec<PlanetBody> {
    let demo: [(&str, f64, &str); 4] = [
        ("Terrestrial", 1.0, "88 days"),
        ("Super-Earth", 1.5, "225 days"),
        ("Gas Giant", 4.0, "365 days"),
        ("Ice Giant", 3.5, "687 days"),
    ];
    demo.iter()
        .enumerate()
        .map(|(index, (kind, radius_rel, period))| {
            planet_body(
                index,
                kind,
                *radius_rel,
                TransitEntry {
                    period: period.to_string(),
                    depth: None,
                    duration: None,
                },
            )
        })
        .collect()
}

pub struct SystemView {
    pub zoom: f64,
    planets: Vec<PlanetBody>,
    built_for: Option<String>,
    selected_planet: Option<usize>,
    press_pos: Option<egui::Pos2>,
}

impl SystemView {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            planets: Vec::new(),
            built_for: None,
            selected_planet: None,
            press_pos: None,
        }
    }

    /// Rebuild the body list only when the analyzed star changes.
    fn prepare(&mut self, summary: &AnalyzeSummary) {
        if self.built_for.as_deref() != Some(summary.star_id.as_str()) {
            self.planets = planets_from_transits(&summary.transits);
            self.built_for = Some(summary.star_id.clone());
            self.selected_planet = None;
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        width: f32,
        height: f32,
        summary: &AnalyzeSummary,
        time: f64,
    ) {
        self.prepare(summary);

        let extent = self
            .planets
            .iter()
            .map(|p| p.orbit_radius)
            .fold(12.0_f64, f64::max)
            + 5.0;
        let margin = extent / self.zoom;

        let positions: Vec<(usize, [f64; 2])> = self
            .planets
            .iter()
            .enumerate()
            .map(|(index, planet)| {
                let angle = planet.phase + planet.angular_speed * time;
                (
                    index,
                    [
                        planet.orbit_radius * angle.cos(),
                        planet.orbit_radius * angle.sin(),
                    ],
                )
            })
            .collect();

        let plot = Plot::new("system_view")
            .data_aspect(1.0)
            .width(width)
            .height(height)
            .show_axes(false)
            .show_grid(false)
            .show_x(false)
            .show_y(false)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .cursor_color(egui::Color32::TRANSPARENT);

        let star_fill = star_color(summary.teff_k);
        let planets = &self.planets;
        let response = plot.show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                [-margin, -margin],
                [margin, margin],
            ));

            for planet in planets {
                let circle: PlotPoints = (0..=ORBIT_SEGMENTS)
                    .map(|i| {
                        let angle = i as f64 / ORBIT_SEGMENTS as f64 * 2.0 * PI;
                        [
                            planet.orbit_radius * angle.cos(),
                            planet.orbit_radius * angle.sin(),
                        ]
                    })
                    .collect();
                plot_ui.line(
                    Line::new("", circle)
                        .color(egui::Color32::from_gray(68))
                        .width(1.0),
                );
            }

            plot_ui.points(
                Points::new("", PlotPoints::new(vec![[0.0, 0.0]]))
                    .radius(14.0)
                    .color(star_fill)
                    .filled(true),
            );

            for (index, position) in &positions {
                let planet = &planets[*index];
                plot_ui.points(
                    Points::new("", PlotPoints::new(vec![*position]))
                        .radius(planet.dot_radius)
                        .color(planet.color)
                        .filled(true),
                );
            }
        });

        let resp = &response.response;

        if resp.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.zoom = (self.zoom * (1.0 + f64::from(scroll.signum()) * 0.1)).clamp(0.3, 4.0);
            }
        }

        if resp.is_pointer_button_down_on() && self.press_pos.is_none() {
            self.press_pos = resp.interact_pointer_pos();
        }
        if resp.clicked() {
            let within_slop = match (self.press_pos, resp.interact_pointer_pos()) {
                (Some(origin), Some(pos)) => (pos - origin).length_sq() <= CLICK_SLOP_PX_SQ,
                _ => true,
            };
            if within_slop {
                if let Some(pointer) = resp.interact_pointer_pos() {
                    self.selected_planet =
                        nearest_planet(&positions, &response.transform, pointer, PICK_RADIUS_PX);
                }
            }
        }
        if !ui.input(|i| i.pointer.any_down()) {
            self.press_pos = None;
        }

        if let Some(hover) = resp.hover_pos() {
            if let Some(idx) = nearest_planet(&positions, &response.transform, hover, PICK_RADIUS_PX)
            {
                let planet = &self.planets[idx];
                ui.painter().text(
                    hover + egui::vec2(12.0, -12.0),
                    egui::Align2::LEFT_BOTTOM,
                    format!("{} · {}", planet.label, planet.period),
                    egui::FontId::proportional(12.0),
                    egui::Color32::WHITE,
                );
            }
        }

        if let Some(idx) = self.selected_planet {
            let planet = &self.planets[idx];
            let mut open = true;
            egui::Window::new(planet.label.clone())
                .open(&mut open)
                .resizable(false)
                .show(ui.ctx(), |ui| {
                    ui.label(format!("Type: {}", planet.kind));
                    ui.label(format!("Period: {}", planet.period));
                    if let Some(depth) = &planet.depth {
                        ui.label(format!("Depth: {depth}"));
                    }
                    if let Some(duration) = &planet.duration {
                        ui.label(format!("Duration: {duration}"));
                    }
                });
            if !open {
                self.selected_planet = None;
            }
        }
    }
}

fn nearest_planet(
    positions: &[(usize, [f64; 2])],
    transform: &PlotTransform,
    pointer: egui::Pos2,
    max_px: f32,
) -> Option<usize> {
    let mut best: Option<(f32, usize)> = None;
    for (index, position) in positions {
        let screen = transform.position_from_point(&PlotPoint::new(position[0], position[1]));
        let dist = screen.distance(pointer);
        if dist <= max_px && best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, *index));
        }
    }
    best.map(|(_, idx)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_transits_falls_back_to_the_demo_system() {
        let planets = planets_from_transits(&[]);
        assert_eq!(planets.len(), 4);
        assert_eq!(planets[0].kind, "Terrestrial");
        assert_eq!(planets[3].period, "687 days");
    }

    #[test]
    fn orbits_widen_and_slow_planets_sit_inside() {
        let transits = vec![
            TransitEntry {
                period: "3.2 days".to_string(),
                depth: Some("0.8".to_string()),
                duration: Some("2.1 h".to_string()),
            },
            TransitEntry {
                period: "11.0 days".to_string(),
                depth: None,
                duration: None,
            },
        ];
        let planets = planets_from_transits(&transits);
        assert_eq!(planets.len(), 2);
        assert!(planets[1].orbit_radius > planets[0].orbit_radius);
        assert!(planets[1].angular_speed > planets[0].angular_speed);
        assert_eq!(planets[0].period, "3.2 days");
        assert_eq!(planets[0].depth.as_deref(), Some("0.8"));
    }

    #[test]
    fn star_color_bands() {
        assert_eq!(
            star_color(Some(40000.0)),
            egui::Color32::from_rgb(0x9b, 0xb5, 0xff)
        );
        assert_eq!(
            star_color(Some(5800.0)),
            egui::Color32::from_rgb(0xff, 0xaa, 0x00)
        );
        assert_eq!(
            star_color(Some(3000.0)),
            egui::Color32::from_rgb(0xff, 0x00, 0x00)
        );
        assert_eq!(star_color(None), egui::Color32::from_rgb(0xff, 0xaa, 0x00));
    }

    #[test]
    fn planet_colors_key_on_type_labels() {
        assert_eq!(
            planet_color("Gas Giant"),
            egui::Color32::from_rgb(0xff, 0xd7, 0x00)
        );
        assert_eq!(
            planet_color("unclassified"),
            egui::Color32::from_rgb(0x80, 0x80, 0x80)
        );
    }
}
