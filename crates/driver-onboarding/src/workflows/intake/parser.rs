use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::io::Read;

use crate::workflows::onboarding::ApplicantRecord;

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<ApplicantRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<ApplicantRow>() {
        let row = record?;
        let email = match &row.email {
            Some(email) => email.clone(),
            None => continue,
        };

        let raw_payload = row.payload();
        let created_at = row.created();
        records.push(ApplicantRecord {
            email,
            phone: row.phone,
            name: row.name,
            applicant_id: row.applicant_id,
            funnel_id: row.funnel_id,
            stage: row.stage,
            status: row.status,
            city: row.city,
            country: row.country,
            raw_payload,
            created_at,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct ApplicantRow {
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(rename = "Phone", default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(
        rename = "Applicant Id",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    applicant_id: Option<String>,
    #[serde(
        rename = "Funnel Id",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    funnel_id: Option<String>,
    #[serde(rename = "Stage", default, deserialize_with = "empty_string_as_none")]
    stage: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(rename = "City", default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    #[serde(rename = "Country", default, deserialize_with = "empty_string_as_none")]
    country: Option<String>,
    #[serde(rename = "Payload", default, deserialize_with = "empty_string_as_none")]
    raw_payload: Option<String>,
    #[serde(
        rename = "Created At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    created_at: Option<String>,
}

impl ApplicantRow {
    /// Export payloads are occasionally truncated mid-object; an unparsable
    /// payload degrades to null rather than poisoning the row.
    fn payload(&self) -> Value {
        self.raw_payload
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null)
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_datetime)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    None
}
