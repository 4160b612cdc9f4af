// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Application entry point wiring egui/eframe to launch the Fichapack UI.

use crate::ui::FichaApp;
use eframe::egui;
use egui_phosphor::Variant;
use tracing_subscriber::EnvFilter;

/// Bootstrap the desktop application and run the main egui event loop.
pub fn run() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Register Phosphor icon font.
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, Variant::Regular);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 720.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Fichapack",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(FichaApp::default()))
        }),
    )
}
