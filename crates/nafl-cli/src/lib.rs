//! CLI library components for the NAFL feature pipeline.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
