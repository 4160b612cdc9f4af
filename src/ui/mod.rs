// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Top-level egui application shell for the intake form.
//! Handles layout, form controls, and wiring to the record service.

pub mod components;

use std::sync::Arc;

use eframe::egui;
use egui_extras::DatePickerButton;

use crate::logic::service::RecordService;
use crate::models::MaritalStatus;
use crate::mvu::{self, AppModel, Command, FormMsg, Msg};
use crate::store::{JsonFileBackend, RecordStore};
use crate::ui::components::{rut_input, search};

/// Stateful egui application for entering and managing patient records.
pub struct FichaApp {
    model: AppModel,
    inbox: Vec<Msg>,
    cmd_tx: crossbeam_channel::Sender<Command>,
    msg_rx: crossbeam_channel::Receiver<Msg>,
}

impl Default for FichaApp {
    fn default() -> Self {
        let service = Arc::new(RecordService::new(RecordStore::new(
            JsonFileBackend::from_env(),
        )));

        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded::<Command>();
        let (msg_tx, msg_rx) = crossbeam_channel::unbounded::<Msg>();

        // Storage round-trips are near-instant, but dialogs (the export
        // sink) must not block the frame loop.
        std::thread::spawn(move || {
            for cmd in cmd_rx.iter() {
                let msg = mvu::run_command(service.as_ref(), cmd);
                let _ = msg_tx.send(msg);
            }
        });

        Self {
            model: AppModel::default(),
            inbox: Vec::new(),
            cmd_tx,
            msg_rx,
        }
    }
}

impl eframe::App for FichaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_spacing(ctx);

        // Pull messages produced by the command worker.
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.model.pending_commands = self.model.pending_commands.saturating_sub(1);
            self.inbox.push(msg);
        }

        // Process pending messages until exhausted.
        let mut msgs = std::mem::take(&mut self.inbox);
        while let Some(msg) = msgs.pop() {
            let mut commands = Vec::new();
            mvu::update(&mut self.model, msg, &mut commands);
            for cmd in commands {
                if self.cmd_tx.send(cmd).is_ok() {
                    self.model.pending_commands += 1;
                }
            }
        }
        self.inbox = msgs;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Ficha Médica");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    self.render_theme_controls(ui);
                    ui.separator();
                    self.render_export_button(ui);
                });
            });
            ui.add_space(4.0);
        });

        self.render_error_modal(ctx);
        self.render_confirm_modal(ctx);

        egui::TopBottomPanel::bottom("status_panel")
            .resizable(false)
            .show(ctx, |ui| {
                self.render_status(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);

            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_form(ui);
                ui.add_space(12.0);

                self.render_search_section(ui);
                ui.add_space(8.0);
            });
        });
    }
}

impl FichaApp {
    fn ensure_spacing(&self, ctx: &egui::Context) {
        ctx.style_mut(|style| {
            style.spacing.item_spacing = egui::vec2(6.0, 6.0);
        });
    }

    fn render_theme_controls(&mut self, ui: &mut egui::Ui) {
        ui.add_space(2.0);
        egui::widgets::global_theme_preference_switch(ui);
    }

    /// Export-all button; the save dialog itself runs on the worker.
    fn render_export_button(&mut self, ui: &mut egui::Ui) {
        let button = egui::Button::new(format!(
            "{} Export CSV",
            egui_phosphor::regular::FILE_CSV
        ));
        if ui.add(button).clicked() {
            self.inbox.push(Msg::ExportRequested);
        }
    }

    /// The intake form: one grid row per record field, then the
    /// save/clear actions.
    fn render_form(&mut self, ui: &mut egui::Ui) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            egui::Grid::new("ficha_grid")
                .num_columns(2)
                .spacing(egui::vec2(8.0, 10.0))
                .min_col_width(140.0)
                .show(ui, |ui| {
                    ui.label("RUT");
                    if let Some(formatted) = rut_input::view(&self.model.form.rut, ui) {
                        self.inbox.push(Msg::Form(FormMsg::RutChanged(formatted)));
                    }
                    ui.end_row();

                    self.text_row(ui, "First names", |form| &form.first_names, FormMsg::FirstNamesChanged);
                    self.text_row(ui, "Last names", |form| &form.last_names, FormMsg::LastNamesChanged);
                    self.text_row(ui, "Address", |form| &form.address, FormMsg::AddressChanged);
                    self.text_row(ui, "City", |form| &form.city, FormMsg::CityChanged);
                    self.text_row(ui, "Phone", |form| &form.phone, FormMsg::PhoneChanged);
                    self.text_row(ui, "Email", |form| &form.email, FormMsg::EmailChanged);

                    ui.label("Birth date");
                    ui.horizontal(|ui| {
                        let mut date = self
                            .model
                            .form
                            .birth_date
                            .unwrap_or_else(|| chrono::Local::now().date_naive());
                        if ui
                            .add(DatePickerButton::new(&mut date).show_icon(true))
                            .changed()
                        {
                            self.inbox.push(Msg::Form(FormMsg::BirthDateChanged(date)));
                        }
                        ui.add_space(8.0);
                        let age = self
                            .model
                            .form
                            .age
                            .map(|a| format!("Age: {a}"))
                            .unwrap_or_else(|| "Age: —".to_string());
                        ui.label(
                            egui::RichText::new(age).color(egui::Color32::from_gray(110)),
                        );
                    });
                    ui.end_row();

                    ui.label("Marital status");
                    self.render_marital_status(ui);
                    ui.end_row();

                    ui.label("Comments");
                    let mut comments = self.model.form.comments.clone();
                    if ui
                        .add(egui::TextEdit::multiline(&mut comments).desired_rows(2))
                        .changed()
                    {
                        self.inbox
                            .push(Msg::Form(FormMsg::CommentsChanged(comments)));
                    }
                    ui.end_row();
                });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let save = egui::Button::new(format!(
                    "{} Save record",
                    egui_phosphor::regular::FLOPPY_DISK
                ));
                if ui.add(save).clicked() {
                    self.inbox.push(Msg::SaveRequested);
                }
                let clear =
                    egui::Button::new(format!("{} Clear", egui_phosphor::regular::ERASER));
                if ui.add(clear).clicked() {
                    self.inbox.push(Msg::Form(FormMsg::Cleared));
                }
            });
        });
    }

    /// One labeled single-line text row of the form grid.
    fn text_row(
        &mut self,
        ui: &mut egui::Ui,
        label: &str,
        get: impl Fn(&mvu::FormModel) -> &String,
        msg: impl Fn(String) -> FormMsg,
    ) {
        ui.label(label);
        let mut value = get(&self.model.form).clone();
        if ui.add(egui::TextEdit::singleline(&mut value)).changed() {
            self.inbox.push(Msg::Form(msg(value)));
        }
        ui.end_row();
    }

    fn render_marital_status(&mut self, ui: &mut egui::Ui) {
        let selected = self
            .model
            .form
            .marital_status
            .map(|s| s.as_str())
            .unwrap_or("Select…");
        egui::ComboBox::from_id_salt("marital_status")
            .selected_text(selected)
            .show_ui(ui, |ui| {
                for status in MaritalStatus::ALL {
                    let current = self.model.form.marital_status == Some(status);
                    if ui.selectable_label(current, status.as_str()).clicked() {
                        self.inbox
                            .push(Msg::Form(FormMsg::MaritalStatusChanged(status)));
                    }
                }
            });
    }

    /// Surname search with per-result edit/delete actions.
    fn render_search_section(&mut self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("Search by last name")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let mut query = self.model.search_query.clone();
                    if ui
                        .add(
                            egui::TextEdit::singleline(&mut query)
                                .hint_text("e.g., Pérez"),
                        )
                        .changed()
                    {
                        self.inbox.push(Msg::QueryChanged(query));
                    }
                    let find = egui::Button::new(format!(
                        "{} Search",
                        egui_phosphor::regular::MAGNIFYING_GLASS
                    ));
                    if ui.add(find).clicked() {
                        self.inbox.push(Msg::SearchRequested);
                    }
                });

                if let Some(results) = &self.model.search_results {
                    ui.add_space(6.0);
                    for action in search::view(results, ui) {
                        match action {
                            search::SearchAction::Edit(rut) => {
                                self.inbox.push(Msg::EditRequested(rut))
                            }
                            search::SearchAction::Delete(rut) => {
                                self.inbox.push(Msg::DeleteRequested(rut))
                            }
                        }
                    }
                }
            });
    }

    /// Render a simple modal window for error messages.
    fn render_error_modal(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.model.error.clone() {
            egui::Window::new("Validation error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        self.inbox.push(Msg::DismissError);
                    }
                });
        }
    }

    /// Render the pending confirmation, when one is parked.
    fn render_confirm_modal(&mut self, ctx: &egui::Context) {
        if let Some(pending) = &self.model.pending {
            let prompt = pending.prompt();
            egui::Window::new("Please confirm")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(prompt);
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            self.inbox.push(Msg::ConfirmAccepted);
                        }
                        if ui.button("No").clicked() {
                            self.inbox.push(Msg::ConfirmDeclined);
                        }
                    });
                });
        }
    }

    /// Render latest status message when present.
    fn render_status(&self, ui: &mut egui::Ui) {
        if let Some(text) = &self.model.status {
            let display = if self.model.pending_commands > 0 {
                format!("{}  ({} working…)", text, self.model.pending_commands)
            } else {
                text.to_string()
            };
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(display).color(egui::Color32::from_gray(68)));
                if self.model.pending_commands > 0 {
                    ui.add(egui::Spinner::new().size(14.0));
                }
            });
        }
    }
}
