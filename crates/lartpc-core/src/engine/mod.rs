//! # Engine Module
//!
//! The stateful half of the library: everything that lives for the duration of a run.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Scan, source, geometry and engine settings with a validating builder
//! - **Error Handling** ([`error`]) - The workflow-level error taxonomy
//! - **Progress Monitoring** ([`progress`]) - Progress events for user-facing front ends
//! - **Deposition** ([`accumulator`]) - Per-event energy bookkeeping with enforced reset/read ordering
//! - **Event Lifecycle** ([`hooks`]) - Begin/end-of-event handlers that reset and report the accumulator
//! - **Transport Contract** ([`transport`]) - The trait any transport engine implements, plus its callback types
//! - **Built-in Engine** ([`stepping`]) - A straight-line stepping engine satisfying the contract
//! - **Results** ([`state`]) - Per-grid-point records and the collected scan result
//!
//! The engine never runs two events at once: callbacks are delivered synchronously and in
//! order from inside [`transport::TransportEngine::simulate_event`].

pub mod accumulator;
pub mod config;
pub mod error;
pub mod hooks;
pub mod progress;
pub mod state;
pub mod stepping;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;
