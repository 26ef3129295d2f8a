//! Error types for loading, device execution, and the step pipeline.
//!
//! Setup failures (`LoadError`, `DeviceError` raised while binding a query)
//! are fatal for a run. `PipelineError` covers violations of the host/device
//! buffer protocol and verification mismatches; a run that hits one is
//! considered compromised and no further output is produced.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading sequence or substitution-matrix input.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: malformed input: {msg}")]
    Malformed { path: PathBuf, msg: String },

    #[error("{path}: record '{record}' contains symbol '{symbol}' outside the alphabet")]
    UnknownSymbol {
        path: PathBuf,
        record: String,
        symbol: char,
    },

    #[error("substitution matrix: {0}")]
    Matrix(String),
}

/// Failure reported by a compute device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("compute device unavailable: {0}")]
    Unavailable(String),

    #[error("no kernel specialisation for unroll factor {0} (supported: 1, 2, 4, 8, 16)")]
    UnsupportedUnroll(usize),

    #[error("step submitted before a query was bound")]
    NoQuery,

    #[error("a step is already in flight")]
    Busy,

    #[error("no step in flight")]
    Idle,

    #[error("buffer geometry mismatch: {0}")]
    Geometry(String),

    #[error("device thread disconnected")]
    Disconnected,

    #[error("unexpected device reply: {0}")]
    Protocol(&'static str),
}

/// Violation of the host/device ownership protocol or of a result invariant.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("buffer set {set} is owned by the device")]
    DeviceOwned { set: usize },

    #[error("buffer set {set} is owned by the host")]
    HostOwned { set: usize },

    #[error("device completed set {got} while set {expected} was awaited")]
    OutOfOrder { expected: usize, got: usize },

    #[error("pending ring of lane {lane} overflowed")]
    RingOverflow { lane: usize },

    #[error(
        "query {query} target {target}: engine record (score {engine}) differs from reference (score {reference})"
    )]
    Verification {
        query: usize,
        target: usize,
        engine: i32,
        reference: i32,
    },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Top-level error for a search run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("file load: {0}")]
    Load(#[from] LoadError),

    #[error("device: {0}")]
    Device(#[from] DeviceError),

    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("config: {0}")]
    Config(String),

    #[error("output: {0}")]
    Output(#[from] io::Error),
}

impl SearchError {
    /// Subsystem name used in fatal diagnostics.
    pub fn subsystem(&self) -> &'static str {
        match self {
            SearchError::Load(_) => "file load",
            SearchError::Device(DeviceError::UnsupportedUnroll(_)) => "kernel",
            SearchError::Device(_) => "device init",
            SearchError::Pipeline(PipelineError::Device(_)) => "device",
            SearchError::Pipeline(_) => "pipeline",
            SearchError::Config(_) => "config",
            SearchError::Output(_) => "output",
        }
    }
}
