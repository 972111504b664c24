//! # LArTPC Angular Scan Library
//!
//! A small, strongly-typed driver for characterizing the directional response of a
//! liquid-argon detector: it builds a nested two-volume geometry, aims a single-particle
//! source from points on a bounding sphere, accumulates the energy deposited in every
//! event and sweeps a deterministic grid of incidence angles.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict layered architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data: physical units, the material database,
//!   the particle table, box geometry with navigation queries, and the directional source
//!   that turns spherical scan parameters into emission parameters.
//!
//! - **[`engine`]: The Machinery.** Stateful pieces that live for the whole run: the
//!   deposition accumulator, the event lifecycle hooks, the transport-engine contract and
//!   the built-in stepping engine that satisfies it, configuration and progress reporting.
//!
//! - **[`vis`]: The Side Channel.** Toolkit-style visualization commands and a scene
//!   recorder. Nothing in the scan depends on it.
//!
//! - **[`workflows`]: The Public API.** The scan driver that wires everything together
//!   and runs one event per grid point.

pub mod core;
pub mod engine;
pub mod vis;
pub mod workflows;
