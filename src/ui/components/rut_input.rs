// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! RUT text field that re-formats its content on every keystroke.
//!
//! The field shows the display form (`12.345.678-5`) at all times.
//! After each edit the raw content is re-formatted and the cursor is
//! shifted by the length delta so typing in the middle of the number
//! does not jump to the end.

use eframe::egui;
use egui::text::{CCursor, CCursorRange};
use egui::text_edit::TextEditState;

use crate::logic::rut;

/// Render the RUT field; returns the re-formatted value when edited.
pub fn view(value: &str, ui: &mut egui::Ui) -> Option<String> {
    let mut text = value.to_string();
    let response = ui.add(
        egui::TextEdit::singleline(&mut text)
            .hint_text("12.345.678-5")
            .char_limit(12),
    );

    if !response.changed() {
        return None;
    }

    let formatted = rut::format(&text);
    if formatted != text {
        shift_cursor(ui, response.id, &text, &formatted);
    }
    Some(formatted)
}

/// Move the caret by the grouping-induced length delta, clamped to the
/// new content.
fn shift_cursor(ui: &egui::Ui, id: egui::Id, before: &str, after: &str) {
    let Some(mut state) = TextEditState::load(ui.ctx(), id) else {
        return;
    };
    let Some(range) = state.cursor.char_range() else {
        return;
    };

    let delta = after.chars().count() as isize - before.chars().count() as isize;
    let shifted = (range.primary.index as isize + delta).max(0) as usize;
    let clamped = shifted.min(after.chars().count());
    state
        .cursor
        .set_char_range(Some(CCursorRange::one(CCursor::new(clamped))));
    state.store(ui.ctx(), id);
}
