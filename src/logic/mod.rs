// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Business logic: RUT codec, CSV export, and the record service.

pub mod csv;
pub mod rut;
pub mod service;
