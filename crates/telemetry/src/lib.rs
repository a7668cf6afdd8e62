//! Telemetry library for the GenAI router.
//!
//! Records request metrics and renders them in the Prometheus text format.

pub mod metrics;
