//! Applicant-intake import: turns a funnel export into normalized
//! `ApplicantRecord`s ready for registration. Email normalization happens
//! here, once, at ingestion; everything downstream works with the canonical
//! key plus the original casing as a fallback.

mod parser;

use std::io::Read;
use std::path::Path;

use crate::workflows::onboarding::ApplicantRecord;

#[derive(Debug)]
pub enum ApplicantImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ApplicantImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicantImportError::Io(err) => {
                write!(f, "failed to read applicant export: {}", err)
            }
            ApplicantImportError::Csv(err) => write!(f, "invalid applicant CSV data: {}", err),
        }
    }
}

impl std::error::Error for ApplicantImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicantImportError::Io(err) => Some(err),
            ApplicantImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ApplicantImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ApplicantImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct ApplicantImporter;

impl ApplicantImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<ApplicantRecord>, ApplicantImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Rows without an email cannot be keyed and are skipped.
    pub fn from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<ApplicantRecord>, ApplicantImportError> {
        Ok(parser::parse_records(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::io::Cursor;

    const HEADER: &str =
        "Email,Phone,Name,Applicant Id,Funnel Id,Stage,Status,City,Country,Payload,Created At\n";

    #[test]
    fn imports_a_complete_row() {
        let csv = format!(
            "{HEADER}Driver@Example.com,+447700900000,Asha Patel,apl-1,funnel-7,interview,active,Leeds,UK,\"{{\"\"vehicle\"\": \"\"Large Van\"\"}}\",2025-05-01T09:30:00Z\n"
        );
        let records = ApplicantImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.email, "Driver@Example.com");
        assert_eq!(record.name.as_deref(), Some("Asha Patel"));
        assert_eq!(record.raw_payload, json!({ "vehicle": "Large Van" }));
        assert_eq!(
            record.created_at.expect("created at").date_naive(),
            NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date")
        );
    }

    #[test]
    fn skips_rows_without_an_email() {
        let csv = format!("{HEADER},+447700900000,No Email,,,,,,,,\n");
        let records = ApplicantImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        assert!(records.is_empty());
    }

    #[test]
    fn tolerates_blank_cells_and_malformed_payload() {
        let csv = format!("{HEADER}driver@example.com,,,,,,,,,not-json,\n");
        let records = ApplicantImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert!(record.phone.is_none());
        assert!(record.raw_payload.is_null());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error = ApplicantImporter::from_path("./does-not-exist.csv")
            .expect_err("expected io error");
        match error {
            ApplicantImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn parses_plain_dates_in_created_at() {
        let csv = format!("{HEADER}driver@example.com,,,,,,,,,,2025-06-15\n");
        let records = ApplicantImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        assert_eq!(
            records[0].created_at.expect("created at").date_naive(),
            NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
        );
    }
}
