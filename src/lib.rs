//! Retention Flux - batch engine for app event telemetry
//!
//! Flux turns a raw event log into a single retention report through a
//! deterministic pipeline: parse → sessionize → profile → discover → encode.
//!
//! ## Modules
//!
//! - **Profiler**: marker-based sessions, session statistics, the first-order
//!   transition model and keyword event classes
//! - **Discovery**: frequent sub-sequences, behavioral segments, session
//!   survival, friction scores and dropout rules

pub mod budget;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod profiler;
pub mod report;
pub mod schema;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use config::AnalysisConfig;
pub use error::ComputeError;
pub use pipeline::{events_to_report, RetentionPipeline};
pub use report::{Report, ReportEncoder, REPORT_VERSION};

// Schema exports
pub use schema::{Event, EventCategory, EventLogAdapter, EventRecord, SCHEMA_VERSION};

/// Flux version embedded in report provenance
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report provenance
pub const PRODUCER_NAME: &str = "retention-flux";
