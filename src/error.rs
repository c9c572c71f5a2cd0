use thiserror::Error;

use crate::backdrop::Phase;

/// Surface or buffer acquisition failure. Non-fatal to the surrounding
/// page: the backdrop logs and stays absent.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("viewport has zero area ({width}x{height} px)")]
    ZeroViewport { width: u32, height: u32 },

    #[error("field arena used after dispose")]
    Disposed,
}

/// Pointer event source failure.
#[derive(Debug, Error)]
pub enum InputAdapterError {
    #[error("no surface to listen for pointer events on")]
    NoSurface,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },

    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },

    #[error("pressure iteration count must be greater than zero")]
    ZeroIterations,
}

#[derive(Debug, Error)]
pub enum BackdropError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Input(#[from] InputAdapterError),

    #[error("cannot start the simulation from {phase:?}")]
    BadPhase { phase: Phase },
}
