// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod gui;
mod types;
use anyhow::anyhow;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = config::ViewerConfig::load()?;
    log::info!("starting in {} mode", config.mode);
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1463.0, 915.0])
        .with_min_inner_size([1200.0, 760.0])
        .with_title("eegview");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "eegview",
        options,
        Box::new(|_cc| Box::new(gui::EegViewApp::new(config))),
    )
    .map_err(|err| anyhow!("viewer window failed: {err}"))
}
