// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Domain layer: pure data types shared between UI, service, and storage.

pub mod record;

pub use record::{MaritalStatus, PatientRecord, RecordDraft};
