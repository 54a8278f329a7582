//! Error types for the reporting layer
//!
//! These never describe a test failure. They travel on a separate channel
//! (see [`crate::StepContext::sink_errors`]) so a broken report cannot mask
//! or replace a scenario's pass/fail outcome.

use thiserror::Error;

use crate::model::StepHandle;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Step name must not be empty")]
    EmptyStepName,

    #[error("Unknown step handle: {0}")]
    UnknownStep(StepHandle),

    #[error("Step already ended: {name}")]
    StepAlreadyEnded { name: String },

    #[error("Step '{name}' is no longer active, cannot record '{what}'")]
    StepClosed { name: String, what: String },

    #[error("Step '{name}' ended with {count} active child step(s)")]
    OpenChildren { name: String, count: usize },

    #[error("Reporting sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;
