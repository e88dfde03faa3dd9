use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Only two categories exist; anything unrecognized is treated as a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    Van,
    Car,
}

impl VehicleCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Van => "van",
            Self::Car => "car",
        }
    }
}

/// Payload locations that have carried the vehicle descriptor at some point
/// in the intake form's history, highest priority first. The first non-empty
/// string wins.
const DESCRIPTOR_PATHS: [&str; 7] = [
    "driver.vehicleType",
    "driver.vehicle",
    "vehicle.type",
    "vehicle.model",
    "vehicleType",
    "motDetails.vehicleModel",
    "vehicle",
];

/// Car-type markers, compared with whitespace/dashes stripped on both sides,
/// so `7 seater`, `7-seater`, and `7seater` all land on the same entry.
const CAR_TYPES: [&str; 6] = ["suv", "7seater", "hatchback", "sedan", "saloon", "estate"];

pub fn classify(payload: &Value) -> VehicleCategory {
    classify_descriptor(find_descriptor(payload))
}

pub fn classify_descriptor(descriptor: Option<&str>) -> VehicleCategory {
    let normalized = match descriptor {
        Some(raw) => normalize(raw),
        None => return VehicleCategory::Car,
    };
    if normalized.contains("van") {
        return VehicleCategory::Van;
    }
    if CAR_TYPES
        .iter()
        .any(|car_type| normalized.contains(car_type))
    {
        return VehicleCategory::Car;
    }
    VehicleCategory::Car
}

fn find_descriptor(payload: &Value) -> Option<&str> {
    DESCRIPTOR_PATHS.iter().find_map(|path| {
        value_at(payload, path)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|descriptor| !descriptor.is_empty())
    })
}

fn value_at<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(payload, |current, segment| current.as_object()?.get(segment))
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
