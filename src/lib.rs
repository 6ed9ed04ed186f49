// lib.rs - busta: reconnaissance pipeline
// Purpose: subdomain enumeration, liveness probing, DNS records and
//          per-host directory busting / port scanning, driven through
//          external tools and collected into one report

pub mod config;
pub mod dns;
pub mod enumeration;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod parallel_executor;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod report_generator;
pub mod runner;
pub mod tools;

pub use error::{Error, Result};
