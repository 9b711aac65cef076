mod analysis;
mod api;
mod app;
mod catalog;
mod filters;
mod hyperparams;
mod math;
mod results;
mod scene;
mod sky;
mod starfield;
mod system_view;
mod viewer;

use eframe::egui;

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("starting exo-viz");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1500.0, 950.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Exo Viz",
        options,
        Box::new(|cc| Ok(Box::new(app::App::new(cc)))),
    )
}
