//! Small helpers shared by the ingestor and analytics crates.

pub mod env;
