//! # Core Module
//!
//! Stateless building blocks for the angular scan.
//!
//! - **Units** ([`units`]) - Internal unit system (mm, MeV, rad) and conversion constants
//! - **Materials** ([`materials`]) - Built-in NIST-style materials and user-defined additions
//! - **Particles** ([`particles`]) - Particle definitions resolvable by name
//! - **Geometry** ([`geometry`]) - Box volumes, the world/detector arena and navigation queries
//! - **Source** ([`source`]) - Emission parameters and the spherical-coordinate directional source

pub mod geometry;
pub mod materials;
pub mod particles;
pub mod source;
pub mod units;
pub mod utils;
