// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

mod app;
mod logic;
mod models;
mod mvu;
mod store;
mod ui;

fn main() -> eframe::Result<()> {
    app::run()
}
