//! # Workflows Module
//!
//! High-level entry points that wire the core and engine layers into complete runs.
//!
//! - **Angular Scan** ([`scan`]) - Builds the detector, registers the source and the
//!   deposition hooks with a transport engine, then fires one event per grid point.

pub mod scan;
