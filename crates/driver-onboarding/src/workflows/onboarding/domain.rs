use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Intake-sourced record describing a candidate before (and independent of)
/// onboarding progress. Stored under the normalized email key; the `email`
/// field keeps whatever casing the intake collaborator supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRecord {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Opaque intake payload. Only the vehicle classifier and report
    /// enrichment look inside it.
    #[serde(default)]
    pub raw_payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// High level onboarding status carried on the driver profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingStatus {
    #[default]
    Started,
    Completed,
}

impl OnboardingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

/// Mutable working document accumulating one flag (often plus a legacy-named
/// duplicate and a timestamp) per completed onboarding step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverProfile {
    pub email: String,
    #[serde(default)]
    pub onboarding_status: OnboardingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub flags: FlagBag,
}

impl DriverProfile {
    pub fn new(email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            onboarding_status: OnboardingStatus::Started,
            report_id: None,
            created_at: Some(created_at),
            updated_at: Some(created_at),
            completed_at: None,
            flags: FlagBag::default(),
        }
    }
}

/// The flat, append-only bag of loosely-named boolean/timestamp fields that
/// implicitly encodes onboarding state. Dotted paths address nested objects,
/// so `progress_verify.confirmed` lives as `{"progress_verify": {"confirmed": true}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagBag(pub BTreeMap<String, Value>);

impl FlagBag {
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// A flag counts as set only when it is literally `true`.
    pub fn is_set(&self, path: &str) -> bool {
        matches!(self.get(path), Some(Value::Bool(true)))
    }

    pub fn any_set(&self, paths: &[&str]) -> bool {
        paths.iter().any(|path| self.is_set(path))
    }

    pub fn string(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn timestamp(&self, path: &str) -> Option<DateTime<Utc>> {
        let raw = self.string(path)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }

    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };
        if parents.is_empty() {
            self.0.insert((*leaf).to_string(), value);
            return;
        }

        let root = self
            .0
            .entry(parents[0].to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !root.is_object() {
            *root = Value::Object(Map::new());
        }
        let mut current = root;
        for segment in &parents[1..] {
            let map = match current {
                Value::Object(map) => map,
                _ => return,
            };
            let next = map
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !next.is_object() {
                *next = Value::Object(Map::new());
            }
            current = next;
        }
        if let Value::Object(map) = current {
            map.insert((*leaf).to_string(), value);
        }
    }

    pub fn clear(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('.').collect();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };
        if parents.is_empty() {
            self.0.remove(*leaf);
            return;
        }

        let mut current = match self.0.get_mut(parents[0]) {
            Some(value) => value,
            None => return,
        };
        for segment in &parents[1..] {
            current = match current
                .as_object_mut()
                .and_then(|map| map.get_mut(*segment))
            {
                Some(value) => value,
                None => return,
            };
        }
        if let Some(map) = current.as_object_mut() {
            map.remove(*leaf);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Weekly availability selections, keyed by day name as written by the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    pub email: String,
    #[serde(default)]
    pub days: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Identity/background verification outcome, independently present or absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub email: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Support,
    Operations,
}

impl AdminRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Support => "Support",
            Self::Operations => "Operations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    ResetProgress,
    PreviewReport,
}

/// Role-tagged operator identity gating the administrative operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub email: String,
    pub role: AdminRole,
    pub permissions: BTreeSet<AdminPermission>,
}

impl AdminUser {
    pub fn can(&self, permission: AdminPermission) -> bool {
        self.permissions.contains(&permission)
    }
}
