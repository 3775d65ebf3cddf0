//! Core domain types for the Surge load-generation engine.

pub mod check;
pub mod config;
pub mod error;
pub mod result;
pub mod schedule;
pub mod summary;

pub use check::{Check, CheckOutcome, CheckSet};
pub use config::{HttpMethod, RunConfig, StageConfig};
pub use error::{EngineError, EngineResult};
pub use result::{RequestError, RequestResult};
pub use schedule::{RampMode, RateSchedule, Stage};
pub use summary::{CheckTally, LatencyHistogram, LatencyStats, RunSummary};
