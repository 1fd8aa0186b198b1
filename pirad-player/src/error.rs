//! Error types for pirad-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Playback operations never return these to their callers (they log and
//! report a boolean); they flow between backends, loaders and the API layer.

use thiserror::Error;

/// Main error type for pirad-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio backend failed to start, stop or change volume
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// GPIO or audio driver not available on this machine
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// Invalid slot, button or volume request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Station file could not be read or parsed
    #[error("Station store error: {0}")]
    Stations(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Control loop is no longer running
    #[error("Control loop stopped")]
    ControlLoopClosed,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from pirad-common
    #[error(transparent)]
    Common(#[from] pirad_common::Error),
}

/// Convenience Result type using pirad-player Error
pub type Result<T> = std::result::Result<T, Error>;
