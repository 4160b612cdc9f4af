// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Root Model-View-Update kernel wiring form state, messages, and commands.
//!
//! `update` is pure over the model; side effects (storage round-trips,
//! the export save dialog) run in [`run_command`] between frames.
//! Confirmation dialogs never live in the service: a
//! `NeedsConfirmation` outcome parks the draft in [`AppModel::pending`]
//! and an accepted confirmation re-enqueues the command with the
//! matching override granted.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};

use crate::logic::service::{
    Concern, Overrides, RecordService, UpsertOutcome, derive_age,
};
use crate::logic::{csv, rut};
use crate::models::{MaritalStatus, PatientRecord, RecordDraft};
use crate::store::StorageBackend;

/// Intake form state, mirroring the fields of a record draft.
#[derive(Default)]
pub struct FormModel {
    /// RUT as displayed (dot-grouped, dash-separated).
    pub rut: String,
    pub first_names: String,
    pub last_names: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    /// Unset until the user picks a date.
    pub birth_date: Option<NaiveDate>,
    /// Derived from `birth_date`; display-only.
    pub age: Option<i32>,
    pub marital_status: Option<MaritalStatus>,
    pub comments: String,
}

impl FormModel {
    /// Snapshot the form into a raw draft for the service.
    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            rut: self.rut.clone(),
            first_names: self.first_names.clone(),
            last_names: self.last_names.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            birth_date: self.birth_date.map(|d| d.to_string()).unwrap_or_default(),
            marital_status: self
                .marital_status
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            comments: self.comments.clone(),
        }
    }

    /// Fill the form from a stored record for editing.
    pub fn load(&mut self, record: &PatientRecord) {
        self.rut = rut::format(&record.rut);
        self.first_names = record.first_names.clone();
        self.last_names = record.last_names.clone();
        self.address = record.address.clone();
        self.city = record.city.clone();
        self.phone = record.phone.clone();
        self.email = record.email.clone();
        self.birth_date = NaiveDate::parse_from_str(&record.birth_date, "%Y-%m-%d").ok();
        self.age = record.age;
        self.marital_status = Some(record.marital_status);
        self.comments = record.comments.clone();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A confirmation awaiting the user's verdict.
pub enum Pending {
    /// Upsert halted on a concern; re-run with the override granted.
    Upsert {
        draft: RecordDraft,
        overrides: Overrides,
        concern: Concern,
    },
    /// Delete awaiting the safety prompt.
    Delete { rut: String },
}

impl Pending {
    /// Prompt text for the confirmation modal.
    pub fn prompt(&self) -> String {
        match self {
            Pending::Upsert {
                concern: Concern::Phone,
                ..
            } => "The phone number does not look like a Chilean mobile \
                  (+56 9XXXXXXXX). Save anyway?"
                .into(),
            Pending::Upsert {
                concern: Concern::Email,
                ..
            } => "The email address looks invalid. Save anyway?".into(),
            Pending::Upsert {
                concern: Concern::DuplicateRut,
                draft,
                ..
            } => format!(
                "A record for RUT {} already exists. Overwrite it?",
                rut::format(&draft.rut)
            ),
            Pending::Delete { rut } => {
                format!("Delete the record for RUT {}?", rut::format(rut))
            }
        }
    }
}

/// Outcome of handing CSV text to the export sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportResult {
    Saved(PathBuf),
    Cancelled,
    NothingToExport,
    Failed(String),
}

/// Top-level application state.
#[derive(Default)]
pub struct AppModel {
    /// Intake form state.
    pub form: FormModel,
    /// Current surname search query.
    pub search_query: String,
    /// `None` before the first search; `Some(empty)` means no results.
    pub search_results: Option<Vec<PatientRecord>>,
    /// Confirmation awaiting the user, rendered as a modal.
    pub pending: Option<Pending>,
    /// Latest status message to display.
    pub status: Option<String>,
    /// Latest error message to display in a modal.
    pub error: Option<String>,
    /// Count of queued background commands.
    pub pending_commands: usize,
}

/// Form field edits routed through the update function.
pub enum FormMsg {
    RutChanged(String),
    FirstNamesChanged(String),
    LastNamesChanged(String),
    AddressChanged(String),
    CityChanged(String),
    PhoneChanged(String),
    EmailChanged(String),
    BirthDateChanged(NaiveDate),
    MaritalStatusChanged(MaritalStatus),
    CommentsChanged(String),
    Cleared,
}

/// Application messages routed through the update function.
pub enum Msg {
    Form(FormMsg),
    SaveRequested,
    UpsertFinished {
        draft: RecordDraft,
        overrides: Overrides,
        outcome: UpsertOutcome,
    },
    ConfirmAccepted,
    ConfirmDeclined,
    QueryChanged(String),
    SearchRequested,
    SearchFinished(Vec<PatientRecord>),
    EditRequested(String),
    RecordLoaded(Option<PatientRecord>),
    DeleteRequested(String),
    DeleteFinished { removed: bool },
    ExportRequested,
    ExportFinished(ExportResult),
    OperationFailed(String),
    DismissError,
}

/// Commands represent side-effects executed between frames.
pub enum Command {
    Upsert {
        draft: RecordDraft,
        overrides: Overrides,
    },
    Search { query: String },
    LoadRecord { rut: String },
    Delete { rut: String },
    ExportCsv,
}

/// Update the application model and enqueue commands.
pub fn update(model: &mut AppModel, msg: Msg, cmds: &mut Vec<Command>) {
    match msg {
        Msg::Form(m) => update_form(&mut model.form, m),
        Msg::SaveRequested => cmds.push(Command::Upsert {
            draft: model.form.to_draft(),
            overrides: Overrides::default(),
        }),
        Msg::UpsertFinished {
            draft,
            overrides,
            outcome,
        } => match outcome {
            UpsertOutcome::Saved { rut, .. } => {
                surface_event(
                    model,
                    format!("Record saved: {}", rut::format(&rut)),
                    false,
                );
                model.form.clear();
                model.search_results = None;
            }
            UpsertOutcome::Rejected(reason) => surface_event(model, reason.to_string(), true),
            UpsertOutcome::NeedsConfirmation(concern) => {
                model.pending = Some(Pending::Upsert {
                    draft,
                    overrides,
                    concern,
                });
            }
        },
        Msg::ConfirmAccepted => match model.pending.take() {
            Some(Pending::Upsert {
                draft,
                overrides,
                concern,
            }) => cmds.push(Command::Upsert {
                draft,
                overrides: overrides.grant(concern),
            }),
            Some(Pending::Delete { rut }) => cmds.push(Command::Delete { rut }),
            None => {}
        },
        Msg::ConfirmDeclined => {
            let message = match model.pending.take() {
                Some(Pending::Upsert {
                    concern: Concern::DuplicateRut,
                    ..
                }) => "Not saved: a record with that RUT already exists.",
                Some(Pending::Upsert { .. }) => "Not saved.",
                Some(Pending::Delete { .. }) => "Delete cancelled.",
                None => return,
            };
            surface_event(model, message.to_string(), false);
        }
        Msg::QueryChanged(query) => model.search_query = query,
        Msg::SearchRequested => cmds.push(Command::Search {
            query: model.search_query.clone(),
        }),
        Msg::SearchFinished(results) => model.search_results = Some(results),
        Msg::EditRequested(rut) => cmds.push(Command::LoadRecord { rut }),
        Msg::RecordLoaded(Some(record)) => {
            model.form.load(&record);
            surface_event(model, "Record loaded for editing.".to_string(), false);
        }
        Msg::RecordLoaded(None) => {
            surface_event(model, "Record not found.".to_string(), false);
        }
        Msg::DeleteRequested(rut) => model.pending = Some(Pending::Delete { rut }),
        Msg::DeleteFinished { removed } => {
            let message = if removed {
                "Record deleted."
            } else {
                "Record not found."
            };
            surface_event(model, message.to_string(), false);
            // Keep the visible results in sync, as re-running the search.
            if model.search_results.is_some() {
                cmds.push(Command::Search {
                    query: model.search_query.clone(),
                });
            }
        }
        Msg::ExportRequested => cmds.push(Command::ExportCsv),
        Msg::ExportFinished(result) => match result {
            ExportResult::Saved(path) => {
                surface_event(model, format!("CSV exported: {}", path.display()), false)
            }
            ExportResult::Cancelled => surface_event(model, "Export cancelled.".to_string(), false),
            ExportResult::NothingToExport => {
                surface_event(model, "No records to export.".to_string(), false)
            }
            ExportResult::Failed(err) => {
                surface_event(model, format!("Failed to export CSV:\n\n{err}"), true)
            }
        },
        Msg::OperationFailed(err) => surface_event(model, err, true),
        Msg::DismissError => model.error = None,
    }
}

/// Execute a command against the record service and return the
/// resulting message. Runs on a worker thread in the application shell.
pub fn run_command<B: StorageBackend>(service: &RecordService<B>, cmd: Command) -> Msg {
    match cmd {
        Command::Upsert { draft, overrides } => match service.upsert(&draft, overrides) {
            Ok(outcome) => Msg::UpsertFinished {
                draft,
                overrides,
                outcome,
            },
            Err(err) => Msg::OperationFailed(format!("Failed to save record:\n\n{err:#}")),
        },
        Command::Search { query } => Msg::SearchFinished(service.find_by_last_name(&query)),
        Command::LoadRecord { rut } => Msg::RecordLoaded(service.get(&rut)),
        Command::Delete { rut } => match service.delete(&rut) {
            Ok(removed) => Msg::DeleteFinished { removed },
            Err(err) => Msg::OperationFailed(format!("Failed to delete record:\n\n{err:#}")),
        },
        Command::ExportCsv => Msg::ExportFinished(export_csv(service)),
    }
}

/// Produce the CSV text and hand it to the save-dialog export sink.
fn export_csv<B: StorageBackend>(service: &RecordService<B>) -> ExportResult {
    let Some(text) = service.export_csv() else {
        return ExportResult::NothingToExport;
    };

    let suggested = csv::export_file_name(Local::now().date_naive());
    let target = rfd::FileDialog::new()
        .set_title("Export records as CSV")
        .set_file_name(&suggested)
        .add_filter("CSV", &["csv"])
        .save_file();

    match target {
        Some(path) => match std::fs::write(&path, text) {
            Ok(()) => ExportResult::Saved(path),
            Err(err) => ExportResult::Failed(err.to_string()),
        },
        None => ExportResult::Cancelled,
    }
}

/// Apply a form edit; the age field follows the birth date.
fn update_form(form: &mut FormModel, msg: FormMsg) {
    match msg {
        FormMsg::RutChanged(text) => form.rut = text,
        FormMsg::FirstNamesChanged(text) => form.first_names = text,
        FormMsg::LastNamesChanged(text) => form.last_names = text,
        FormMsg::AddressChanged(text) => form.address = text,
        FormMsg::CityChanged(text) => form.city = text,
        FormMsg::PhoneChanged(text) => form.phone = text,
        FormMsg::EmailChanged(text) => form.email = text,
        FormMsg::BirthDateChanged(date) => {
            // The picker cannot cap its range; clamp to today here.
            let today = Local::now().date_naive();
            let date = date.min(today);
            form.birth_date = Some(date);
            form.age = derive_age(&date.to_string(), today);
        }
        FormMsg::MaritalStatusChanged(status) => form.marital_status = Some(status),
        FormMsg::CommentsChanged(text) => form.comments = text,
        FormMsg::Cleared => form.clear(),
    }
}

/// Update status/error fields consistently for user feedback.
fn surface_event(model: &mut AppModel, message: String, is_error: bool) {
    if is_error {
        model.error = Some(message.clone());
    }
    model.status = Some(message);
}
