// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Search results list with per-record edit and delete actions.

use eframe::egui;

use crate::logic::rut;
use crate::models::PatientRecord;

/// Row actions emitted by the results list.
pub enum SearchAction {
    /// Load the record with this canonical RUT into the form.
    Edit(String),
    /// Ask to delete the record with this canonical RUT.
    Delete(String),
}

/// Render the result cards and return any triggered actions.
pub fn view(results: &[PatientRecord], ui: &mut egui::Ui) -> Vec<SearchAction> {
    let mut actions = Vec::new();

    if results.is_empty() {
        ui.label(
            egui::RichText::new("No records found.").color(egui::Color32::from_gray(110)),
        );
        return actions;
    }

    for record in results {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(
                egui::RichText::new(format!("{} {}", record.first_names, record.last_names))
                    .strong(),
            );
            ui.label(format!("RUT: {}", rut::format(&record.rut)));
            let age = record
                .age
                .map(|a| a.to_string())
                .unwrap_or_else(|| "not recorded".to_string());
            ui.label(format!("Age: {age}"));
            ui.label(format!("Tel: {} — Email: {}", record.phone, record.email));

            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let edit =
                    egui::Button::new(format!("{} Edit", egui_phosphor::regular::PENCIL_SIMPLE));
                if ui.add(edit).clicked() {
                    actions.push(SearchAction::Edit(record.rut.clone()));
                }
                let delete =
                    egui::Button::new(format!("{} Delete", egui_phosphor::regular::TRASH));
                if ui.add(delete).clicked() {
                    actions.push(SearchAction::Delete(record.rut.clone()));
                }
            });
        });
        ui.add_space(6.0);
    }

    actions
}
