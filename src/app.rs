//! Application shell and eframe integration.
//!
//! Defines the App struct, initialization, and the main update loop that
//! drains worker-thread results, lays out the panels, and keeps the
//! animation repaint going. GL resources are released in `on_exit`.

use eframe::{egui, glow};
use egui::mutex::Mutex;
use std::sync::Arc;

use crate::sky::SkyRenderer;
use crate::viewer::ViewerState;

pub(crate) struct App {
    pub(crate) viewer: ViewerState,
    sky_renderer: Option<Arc<Mutex<SkyRenderer>>>,
    sky_error: Option<String>,
}

impl App {
    pub(crate) fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let (sky_renderer, sky_error) = match cc.gl.as_ref() {
            Some(gl) => match SkyRenderer::new(gl) {
                Ok(renderer) => (Some(Arc::new(Mutex::new(renderer))), None),
                Err(e) => {
                    log::warn!("sky renderer unavailable: {e}");
                    (None, Some(e))
                }
            },
            None => (None, Some("glow backend unavailable".to_string())),
        };
        Self {
            viewer: ViewerState::new(),
            sky_renderer,
            sky_error,
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals({
            let mut visuals = egui::Visuals::dark();
            let black = egui::Color32::BLACK;
            visuals.window_fill = egui::Color32::from_gray(12);
            visuals.panel_fill = black;
            visuals.extreme_bg_color = black;
            visuals.faint_bg_color = egui::Color32::from_gray(15);
            visuals
        });

        self.viewer.drain_results();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.weak(format!("API: {}", self.viewer.api.base_url()));
                ui.separator();
                ui.weak(format!(
                    "Session {}",
                    self.viewer.session_started.format("%H:%M UTC")
                ));
                let build = env!("GIT_HASH");
                if !build.is_empty() {
                    ui.separator();
                    ui.weak(format!("build {build}"));
                }
                if let Some(error) = &self.sky_error {
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::from_rgb(255, 107, 107),
                        format!("Background renderer disabled: {error}"),
                    );
                }
                if !self.viewer.stars.is_empty() {
                    ui.separator();
                    ui.weak(format!("{} stars loaded", self.viewer.stars.len()));
                }
            });
        });

        egui::SidePanel::left("sidebar")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                self.viewer.side_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.viewer.central_view(ui, self.sky_renderer.as_ref());
        });

        self.viewer.overlay_windows(ctx);

        // the 3D views are time-animated, so keep frames coming
        ctx.request_repaint();
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.viewer.starfield.scene.teardown();
        if let Some(gl) = gl {
            if let Some(renderer) = &self.sky_renderer {
                renderer.lock().destroy(gl);
            }
        }
    }
}
