use thiserror::Error;

use super::config::ConfigError;
use crate::core::geometry::GeometryError;
use crate::core::materials::MaterialError;
use crate::core::source::SourceError;

/// Which part of the failure taxonomy an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad geometry or settings, or an unknown name. Raised before any event.
    Configuration,
    /// The transport engine refused or aborted. Terminates the remaining grid points.
    EngineFailure,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Geometry construction failed: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Material lookup failed: {0}")]
    Material(#[from] MaterialError),

    #[error("Source setup failed: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown physics list '{0}'")]
    UnknownPhysicsList(String),

    #[error("Transport engine cannot initialize without a registered {0}")]
    MissingRegistration(&'static str),

    #[error("Transport engine is already initialized; cannot accept {0}")]
    AlreadyInitialized(&'static str),

    #[error("Transport engine has not been initialized")]
    NotInitialized,

    #[error("Event {event_id} aborted: {reason}")]
    EventAborted { event_id: u64, reason: String },

    #[error("Expected {expected} end-of-event report(s) but received {received}")]
    MissingEventReport { expected: usize, received: usize },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Geometry(_)
            | Self::Material(_)
            | Self::Source(_)
            | Self::Config(_)
            | Self::UnknownPhysicsList(_) => ErrorClass::Configuration,
            _ => ErrorClass::EngineFailure,
        }
    }
}
