//! Credit card recommendation engine for Indian card products.
//!
//! The [`advisor`] module holds the catalog, profile normalization, eligibility, scoring,
//! persona detection and assembly pipeline together with the HTTP router that exposes it.

pub mod advisor;
pub mod config;
pub mod error;
pub mod telemetry;
