//! Error taxonomy for the driver.
//!
//! Initialisation failures of the engine are fatal to building a
//! [`Driver`](crate::driver::Driver); dictionary failures only disable the
//! dictionary feature.  Faults inside queued tasks never surface here — the
//! worker logs them and moves on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The synthesis engine could not be created.
    #[error("failed to create the synthesis engine: {0}")]
    EngineInit(String),

    /// The synthesis engine failed while speaking.
    #[error("synthesis engine error: {0}")]
    Engine(String),

    /// The pronunciation dictionary could not be opened or queried.
    #[error("pronunciation dictionary error: {0}")]
    Dictionary(String),

    /// The audio sink rejected a buffer.
    #[error("audio sink error: {0}")]
    Sink(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;
