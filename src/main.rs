// src/main.rs
mod app;
mod ui;
mod video;

use eframe::egui;

fn main() {
    tracing_subscriber::fmt::init();

    if let Ok(p) = std::env::current_exe() {
        tracing::debug!("Running from: {}", p.display());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 700.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Swim Curator",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(ui::create_visuals());
            Box::new(app::SwimCuratorApp::new(cc))
        }),
    );

    if let Err(e) = result {
        tracing::error!("Error running application: {:?}", e);
    }
}
