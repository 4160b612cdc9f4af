// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Patient record domain model shared between UI, service, and storage.

use serde::{Deserialize, Serialize};

/// Closed set of marital statuses offered by the intake form.
///
/// Wire and display tokens are the Spanish labels used on the form;
/// anything outside the set is a validation error, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaritalStatus {
    #[serde(rename = "Soltero/a")]
    Single,
    #[serde(rename = "Casado/a")]
    Married,
    #[serde(rename = "Conviviente civil")]
    CivilUnion,
    #[serde(rename = "Divorciado/a")]
    Divorced,
    #[serde(rename = "Viudo/a")]
    Widowed,
}

impl MaritalStatus {
    /// All statuses in form display order.
    pub const ALL: [MaritalStatus; 5] = [
        MaritalStatus::Single,
        MaritalStatus::Married,
        MaritalStatus::CivilUnion,
        MaritalStatus::Divorced,
        MaritalStatus::Widowed,
    ];

    /// Parse a form token; `None` for out-of-set values.
    pub fn from_token(raw: &str) -> Option<Self> {
        match raw {
            "Soltero/a" => Some(Self::Single),
            "Casado/a" => Some(Self::Married),
            "Conviviente civil" => Some(Self::CivilUnion),
            "Divorciado/a" => Some(Self::Divorced),
            "Viudo/a" => Some(Self::Widowed),
            _ => None,
        }
    }

    /// Token used on the form, in storage, and in CSV export.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "Soltero/a",
            Self::Married => "Casado/a",
            Self::CivilUnion => "Conviviente civil",
            Self::Divorced => "Divorciado/a",
            Self::Widowed => "Viudo/a",
        }
    }
}

/// A stored intake record, keyed in the store by its canonical RUT.
///
/// `age` is derived from `birth_date` on every save; `created_at` is
/// stamped on first write and preserved verbatim on overwrite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Canonical (unpunctuated, uppercase) RUT.
    pub rut: String,
    pub first_names: String,
    pub last_names: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    /// Birth date in ISO `YYYY-MM-DD` form, as entered on the form.
    pub birth_date: String,
    /// Age in whole years as of the most recent birthday; unset when
    /// the birth date could not be interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    pub marital_status: MaritalStatus,
    #[serde(default)]
    pub comments: String,
    /// RFC 3339 timestamp of the first write of this RUT.
    pub created_at: String,
}

/// Raw, untrimmed field values collected from the intake form.
///
/// Everything is a string at this point; the service turns a draft
/// into a [`PatientRecord`] or reports why it cannot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub rut: String,
    pub first_names: String,
    pub last_names: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub birth_date: String,
    pub marital_status: String,
    pub comments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marital_status_tokens_round_trip() {
        for status in MaritalStatus::ALL {
            assert_eq!(MaritalStatus::from_token(status.as_str()), Some(status));
        }
        assert_eq!(MaritalStatus::from_token("Separado"), None);
        assert_eq!(MaritalStatus::from_token(""), None);
    }

    #[test]
    fn record_serializes_with_form_field_names() {
        let record = PatientRecord {
            rut: "123456785".into(),
            first_names: "Ana María".into(),
            last_names: "Pérez Soto".into(),
            address: "Calle A 123".into(),
            city: "Santiago".into(),
            phone: "+56912345678".into(),
            email: "ana@correo.cl".into(),
            birth_date: "1995-01-01".into(),
            age: Some(31),
            marital_status: MaritalStatus::Single,
            comments: "test".into(),
            created_at: "2026-08-26T12:00:00Z".into(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["rut"], "123456785");
        assert_eq!(json["firstNames"], "Ana María");
        assert_eq!(json["lastNames"], "Pérez Soto");
        assert_eq!(json["birthDate"], "1995-01-01");
        assert_eq!(json["maritalStatus"], "Soltero/a");
        assert_eq!(json["createdAt"], "2026-08-26T12:00:00Z");
        assert_eq!(json["age"], 31);
    }

    // Records persisted before the age field existed must load as unset.
    #[test]
    fn missing_optional_fields_deserialize_as_unset() {
        let json = r#"{
            "rut": "222222222",
            "firstNames": "Luis",
            "lastNames": "Gómez",
            "address": "Calle B 456",
            "city": "Valparaíso",
            "phone": "+56987654321",
            "email": "luis@correo.cl",
            "birthDate": "1980-02-02",
            "maritalStatus": "Casado/a",
            "createdAt": "2026-01-01T00:00:00Z"
        }"#;

        let record: PatientRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.age, None);
        assert_eq!(record.comments, "");
        assert_eq!(record.marital_status, MaritalStatus::Married);
    }
}
