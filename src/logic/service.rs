// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Record operations: validated upsert, search, delete, and export.
//!
//! The service is a pure decision layer. It never prompts: anything a
//! person must confirm (duplicate RUT overwrite, suspicious phone or
//! email) comes back as a [`UpsertOutcome::NeedsConfirmation`] and the
//! shell re-invokes the operation with the matching [`Overrides`] flag
//! set once the user agrees.

use chrono::{Datelike, Local, NaiveDate};
use email_address::EmailAddress;
use std::str::FromStr;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::logic::{csv, rut};
use crate::models::{MaritalStatus, PatientRecord, RecordDraft};
use crate::store::{RecordStore, StorageBackend};

/// Hard validation failures; the draft is rejected and nothing is written.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("all required fields must be filled in ({0} is missing)")]
    MissingField(&'static str),
    #[error("invalid RUT (check the verification digit)")]
    InvalidRut,
    #[error("unknown marital status: {0:?}")]
    UnknownMaritalStatus(String),
}

/// Soft concerns a person can wave through, plus the duplicate-RUT
/// conflict that needs an explicit overwrite go-ahead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Concern {
    /// Phone does not look like a Chilean mobile number.
    Phone,
    /// Email does not match the minimal `local@domain.tld` shape.
    Email,
    /// A record with this RUT already exists.
    DuplicateRut,
}

/// Caller-granted permissions for the concerns above.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overrides {
    pub accept_phone: bool,
    pub accept_email: bool,
    pub overwrite: bool,
}

impl Overrides {
    /// Copy with the flag for `concern` granted.
    pub fn grant(mut self, concern: Concern) -> Self {
        match concern {
            Concern::Phone => self.accept_phone = true,
            Concern::Email => self.accept_email = true,
            Concern::DuplicateRut => self.overwrite = true,
        }
        self
    }
}

/// Result of an upsert attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Saved { rut: String, overwritten: bool },
    Rejected(ValidationError),
    NeedsConfirmation(Concern),
}

/// Orchestrates validation and storage for patient records.
pub struct RecordService<B> {
    store: RecordStore<B>,
}

impl<B: StorageBackend> RecordService<B> {
    pub fn new(store: RecordStore<B>) -> Self {
        Self { store }
    }

    /// Validate `draft` and store it under its canonical RUT.
    ///
    /// Hard failures (missing field, bad RUT, out-of-set marital
    /// status) reject the draft. Soft failures and an existing RUT ask
    /// for confirmation unless the matching override is already
    /// granted. `Err` is reserved for storage faults.
    pub fn upsert(&self, draft: &RecordDraft, overrides: Overrides) -> anyhow::Result<UpsertOutcome> {
        let required = [
            ("RUT", &draft.rut),
            ("first names", &draft.first_names),
            ("last names", &draft.last_names),
            ("address", &draft.address),
            ("city", &draft.city),
            ("phone", &draft.phone),
            ("email", &draft.email),
            ("birth date", &draft.birth_date),
            ("marital status", &draft.marital_status),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Ok(UpsertOutcome::Rejected(ValidationError::MissingField(name)));
            }
        }

        if !rut::is_valid(&draft.rut) {
            return Ok(UpsertOutcome::Rejected(ValidationError::InvalidRut));
        }

        let Some(marital_status) = MaritalStatus::from_token(draft.marital_status.trim()) else {
            return Ok(UpsertOutcome::Rejected(ValidationError::UnknownMaritalStatus(
                draft.marital_status.trim().to_string(),
            )));
        };

        if !overrides.accept_phone && !plausible_chilean_mobile(&draft.phone) {
            return Ok(UpsertOutcome::NeedsConfirmation(Concern::Phone));
        }
        if !overrides.accept_email && !plausible_email(&draft.email) {
            return Ok(UpsertOutcome::NeedsConfirmation(Concern::Email));
        }

        let key = rut::clean(&draft.rut);
        let mut records = self.store.load_all();
        let existing = records.get(&key);
        if existing.is_some() && !overrides.overwrite {
            return Ok(UpsertOutcome::NeedsConfirmation(Concern::DuplicateRut));
        }

        let overwritten = existing.is_some();
        // First-write timestamp: an overwrite keeps the original stamp.
        let created_at = existing
            .map(|record| record.created_at.clone())
            .unwrap_or_else(now_rfc3339);

        let record = PatientRecord {
            rut: key.clone(),
            first_names: draft.first_names.trim().to_string(),
            last_names: draft.last_names.trim().to_string(),
            address: draft.address.trim().to_string(),
            city: draft.city.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            email: draft.email.trim().to_string(),
            birth_date: draft.birth_date.trim().to_string(),
            age: derive_age(&draft.birth_date, Local::now().date_naive()),
            marital_status,
            comments: draft.comments.trim().to_string(),
            created_at,
        };
        records.insert(key.clone(), record);
        self.store.save_all(&records)?;

        info!(rut = %key, overwritten, "record saved");
        Ok(UpsertOutcome::Saved {
            rut: key,
            overwritten,
        })
    }

    /// Case-insensitive substring search over last names.
    ///
    /// An empty query matches every record; results follow store
    /// iteration order (canonical RUT).
    pub fn find_by_last_name(&self, query: &str) -> Vec<PatientRecord> {
        let needle = query.trim().to_lowercase();
        self.store
            .load_all()
            .into_values()
            .filter(|record| record.last_names.to_lowercase().contains(&needle))
            .collect()
    }

    /// Fetch a single record by RUT, `None` when absent.
    pub fn get(&self, rut_raw: &str) -> Option<PatientRecord> {
        self.store.load_all().remove(&rut::clean(rut_raw))
    }

    /// Remove a record by RUT. `Ok(false)` for an absent key (silent
    /// no-op, nothing is persisted). Confirmation lives in the shell.
    pub fn delete(&self, rut_raw: &str) -> anyhow::Result<bool> {
        let key = rut::clean(rut_raw);
        let mut records = self.store.load_all();
        if records.remove(&key).is_none() {
            return Ok(false);
        }
        self.store.save_all(&records)?;
        info!(rut = %key, "record deleted");
        Ok(true)
    }

    /// Project every stored record to CSV text, `None` when the store
    /// is empty so "nothing to export" stays distinguishable from an
    /// export sink failure.
    pub fn export_csv(&self) -> Option<String> {
        let records = self.store.load_all();
        if records.is_empty() {
            return None;
        }
        let rows: Vec<csv::Row> = records.values().map(csv_row).collect();
        Some(csv::to_csv(&rows))
    }
}

/// Age in whole years as of the most recent birthday, clamped at 0.
/// `None` for empty or unparsable input.
pub fn derive_age(birth_iso: &str, today: NaiveDate) -> Option<i32> {
    let birth = NaiveDate::parse_from_str(birth_iso.trim(), "%Y-%m-%d").ok()?;
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    Some(age.max(0))
}

/// Chilean mobile shape: optional `+56`/`56` prefix, then `9` and
/// exactly 8 digits. Whitespace is ignored.
pub fn plausible_chilean_mobile(raw: &str) -> bool {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let rest = match compact.strip_prefix('+') {
        // A plus sign is only meaningful in front of the country code.
        Some(after_plus) => match after_plus.strip_prefix("56") {
            Some(rest) => rest,
            None => return false,
        },
        None => compact.strip_prefix("56").unwrap_or(&compact),
    };
    rest.len() == 9 && rest.starts_with('9') && rest.chars().all(|c| c.is_ascii_digit())
}

/// Minimal `local@domain.tld` shape on top of the RFC parser.
pub fn plausible_email(raw: &str) -> bool {
    let email = raw.trim();
    EmailAddress::from_str(email).is_ok()
        && email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}

/// Export column order, fixed regardless of struct layout.
fn csv_row(record: &PatientRecord) -> csv::Row {
    [
        ("rut", record.rut.clone()),
        ("firstNames", record.first_names.clone()),
        ("lastNames", record.last_names.clone()),
        ("address", record.address.clone()),
        ("city", record.city.clone()),
        ("phone", record.phone.clone()),
        ("email", record.email.clone()),
        ("birthDate", record.birth_date.clone()),
        (
            "age",
            record.age.map(|a| a.to_string()).unwrap_or_default(),
        ),
        ("maritalStatus", record.marital_status.as_str().to_string()),
        ("comments", record.comments.clone()),
        ("createdAt", record.created_at.clone()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    fn service() -> RecordService<MemoryBackend> {
        RecordService::new(RecordStore::new(MemoryBackend::default()))
    }

    fn draft(rut: &str, last_names: &str) -> RecordDraft {
        RecordDraft {
            rut: rut.to_string(),
            first_names: "Ana".into(),
            last_names: last_names.into(),
            address: "Calle A 123".into(),
            city: "Santiago".into(),
            phone: "+56912345678".into(),
            email: "ana@correo.cl".into(),
            birth_date: "1995-01-01".into(),
            marital_status: "Soltero/a".into(),
            comments: "test".into(),
        }
    }

    #[test]
    fn fresh_rut_saves_without_confirmation() {
        let svc = service();

        let outcome = svc
            .upsert(&draft("12.345.678-5", "Pérez"), Overrides::default())
            .unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Saved {
                rut: "123456785".into(),
                overwritten: false
            }
        );
        assert!(svc.get("12345678-5").is_some());
    }

    #[test]
    fn missing_required_field_rejects() {
        let svc = service();
        let mut d = draft("12345678-5", "Pérez");
        d.city = "   ".into();

        let outcome = svc.upsert(&d, Overrides::default()).unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Rejected(ValidationError::MissingField("city"))
        );
        assert!(svc.get("12345678-5").is_none(), "no partial write");
    }

    #[test]
    fn invalid_rut_rejects() {
        let svc = service();

        let outcome = svc
            .upsert(&draft("12345678-4", "Pérez"), Overrides::default())
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Rejected(ValidationError::InvalidRut));
    }

    #[test]
    fn out_of_set_marital_status_rejects() {
        let svc = service();
        let mut d = draft("12345678-5", "Pérez");
        d.marital_status = "Separado".into();

        let outcome = svc.upsert(&d, Overrides::default()).unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Rejected(ValidationError::UnknownMaritalStatus("Separado".into()))
        );
    }

    #[test]
    fn suspicious_phone_needs_confirmation_until_overridden() {
        let svc = service();
        let mut d = draft("12345678-5", "Pérez");
        d.phone = "123456".into();

        let first = svc.upsert(&d, Overrides::default()).unwrap();
        assert_eq!(first, UpsertOutcome::NeedsConfirmation(Concern::Phone));
        assert!(svc.get("12345678-5").is_none());

        let second = svc
            .upsert(&d, Overrides::default().grant(Concern::Phone))
            .unwrap();
        assert!(matches!(second, UpsertOutcome::Saved { .. }));
    }

    #[test]
    fn suspicious_email_needs_confirmation_until_overridden() {
        let svc = service();
        let mut d = draft("12345678-5", "Pérez");
        d.email = "ana@localhost".into();

        let first = svc.upsert(&d, Overrides::default()).unwrap();
        assert_eq!(first, UpsertOutcome::NeedsConfirmation(Concern::Email));

        let second = svc
            .upsert(&d, Overrides::default().grant(Concern::Email))
            .unwrap();
        assert!(matches!(second, UpsertOutcome::Saved { .. }));
    }

    #[test]
    fn duplicate_rut_needs_overwrite_confirmation() {
        let svc = service();
        svc.upsert(&draft("12345678-5", "Pérez"), Overrides::default())
            .unwrap();

        let mut updated = draft("12.345.678-5", "Pérez Soto");
        updated.city = "Valparaíso".into();

        let outcome = svc.upsert(&updated, Overrides::default()).unwrap();
        assert_eq!(outcome, UpsertOutcome::NeedsConfirmation(Concern::DuplicateRut));

        // Declined confirmation is simply never re-invoked: stored
        // record must be unchanged.
        let stored = svc.get("12345678-5").unwrap();
        assert_eq!(stored.last_names, "Pérez");
        assert_eq!(stored.city, "Santiago");

        let outcome = svc
            .upsert(&updated, Overrides::default().grant(Concern::DuplicateRut))
            .unwrap();
        assert_eq!(
            outcome,
            UpsertOutcome::Saved {
                rut: "123456785".into(),
                overwritten: true
            }
        );
        assert_eq!(svc.get("12345678-5").unwrap().city, "Valparaíso");
    }

    #[test]
    fn overwrite_preserves_created_at() {
        let svc = service();
        svc.upsert(&draft("12345678-5", "Pérez"), Overrides::default())
            .unwrap();
        let first_stamp = svc.get("12345678-5").unwrap().created_at;
        assert!(!first_stamp.is_empty());

        let mut updated = draft("12345678-5", "Pérez Soto");
        updated.comments = "updated".into();
        svc.upsert(&updated, Overrides::default().grant(Concern::DuplicateRut))
            .unwrap();

        assert_eq!(svc.get("12345678-5").unwrap().created_at, first_stamp);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let svc = service();
        svc.upsert(&draft("12345678-5", "Pérez Soto"), Overrides::default())
            .unwrap();
        svc.upsert(&draft("11111111-1", "Gómez"), Overrides::default())
            .unwrap();

        let hits = svc.find_by_last_name("pérez");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rut, "123456785");

        assert_eq!(svc.find_by_last_name("").len(), 2, "empty query matches all");
        assert!(svc.find_by_last_name("zzz-no-match").is_empty());
    }

    #[test]
    fn delete_removes_present_and_ignores_absent() {
        let svc = service();
        svc.upsert(&draft("12345678-5", "Pérez"), Overrides::default())
            .unwrap();

        assert!(svc.delete("12.345.678-5").unwrap());
        assert!(svc.get("12345678-5").is_none());
        assert!(!svc.delete("12345678-5").unwrap(), "absent key is a no-op");
    }

    #[test]
    fn derive_age_counts_whole_years_since_last_birthday() {
        let birthday_not_reached = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let birthday_reached = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        assert_eq!(derive_age("1990-06-15", birthday_not_reached), Some(33));
        assert_eq!(derive_age("1990-06-15", birthday_reached), Some(34));
        assert_eq!(derive_age("", birthday_reached), None);
        assert_eq!(derive_age("not-a-date", birthday_reached), None);
    }

    #[test]
    fn plausible_phone_accepts_chilean_mobile_shapes() {
        assert!(plausible_chilean_mobile("+56912345678"));
        assert!(plausible_chilean_mobile("56912345678"));
        assert!(plausible_chilean_mobile("912345678"));
        assert!(plausible_chilean_mobile("+56 9 1234 5678"));

        assert!(!plausible_chilean_mobile("812345678"));
        assert!(!plausible_chilean_mobile("+912345678"));
        assert!(!plausible_chilean_mobile("9123"));
        assert!(!plausible_chilean_mobile(""));
    }

    #[test]
    fn plausible_email_requires_dotted_domain() {
        assert!(plausible_email("ana@correo.cl"));
        assert!(plausible_email("ana.maria@sub.correo.cl"));

        assert!(!plausible_email("ana@localhost"));
        assert!(!plausible_email("ana correo.cl"));
        assert!(!plausible_email(""));
    }

    #[test]
    fn export_is_none_when_store_is_empty() {
        assert_eq!(service().export_csv(), None);
    }

    #[test]
    fn export_projects_fixed_column_order() {
        let svc = service();
        svc.upsert(&draft("12345678-5", "Pérez"), Overrides::default())
            .unwrap();

        let text = svc.export_csv().unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "rut,firstNames,lastNames,address,city,phone,email,birthDate,age,maritalStatus,comments,createdAt"
        );
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("123456785,Ana,Pérez,"));
    }
}
