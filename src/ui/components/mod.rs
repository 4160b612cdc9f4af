// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Reusable UI building blocks for the intake form and search panel.

pub mod rut_input;
pub mod search;
