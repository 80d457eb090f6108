//! Configuration for the geosphere engine.
//!
//! Settings persist to disk as RON files. Every section falls back to its
//! defaults for missing fields, and CLI flags parsed with clap override
//! whatever was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{BodyConfig, Config, DebugConfig, FlightConfig, GeoSphereConfig, JobsConfig};
pub use error::ConfigError;
