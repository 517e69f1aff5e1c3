#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::anyhow;
use clap::Parser;

use gantt_timeline::app::{Backend, TimelineApp};
use gantt_timeline::cli::Cli;
use gantt_timeline::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    logging::init(&config.log.filter);

    let backend = Backend::start(&config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Gantt Timeline"),
        ..Default::default()
    };

    eframe::run_native(
        "Gantt Timeline",
        options,
        Box::new(move |cc| Ok(Box::new(TimelineApp::new(cc, &config, backend)))),
    )
    .map_err(|err| anyhow!("ui terminated: {err}"))
}
