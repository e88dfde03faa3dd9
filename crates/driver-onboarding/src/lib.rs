//! Core library for the driver onboarding service: configuration, telemetry,
//! and the onboarding workflow modules.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
