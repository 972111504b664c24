//! Internal units: lengths in millimetres, energies in MeV, angles in radians.
//!
//! Multiply by a constant to convert into internal units, divide to convert out of them
//! (`2.0 * M`, `edep / KEV`).

pub const MM: f64 = 1.0;
pub const CM: f64 = 10.0 * MM;
pub const M: f64 = 1000.0 * MM;

pub const MEV: f64 = 1.0;
pub const KEV: f64 = 1.0e-3 * MEV;
pub const GEV: f64 = 1.0e3 * MEV;

pub const RAD: f64 = 1.0;
pub const DEG: f64 = std::f64::consts::PI / 180.0 * RAD;
