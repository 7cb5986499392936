//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.
//!
//! `UserError` covers everything the user can fix themselves: it exits with
//! code 2, prints no error chain, and may carry a hint. Everything else is a
//! system error reported through `anyhow` and exits with code 1.

use thiserror::Error;

/// Exit code for user-recoverable errors, distinct from generic failures.
pub const USER_ERROR_EXIT: u8 = 2;

/// Errors the user can correct at the CLI boundary.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid environment variable '{0}'. Expected KEY=VALUE.")]
    InvalidEnvPair(String),

    #[error("Module library not found at {0}.")]
    MissingLibrary(String),

    #[error("Module library at {root} has no defaults file ({file}).")]
    MissingLibraryDefaults { root: String, file: String },

    #[error("Unknown module '{module}'. Available modules: {available}.")]
    UnknownModule { module: String, available: String },

    #[error("Unknown distribution '{0}'. Expected 'trino' or 'starburst'.")]
    UnknownDistribution(String),

    #[error("Invalid cluster version '{0}'.")]
    MalformedVersion(String),

    #[error("Cluster version {version} is below the minimum. {dist} requires at least {minimum}.")]
    VersionBelowMinimum {
        dist: String,
        version: String,
        minimum: u32,
    },

    #[error("Version '{version}' is missing the enterprise suffix '{suffix}'.")]
    MissingEnterpriseSuffix { version: String, suffix: String },

    #[error("Module '{module}' declares an invalid version window ({entries} entries).")]
    InvalidVersionWindow { module: String, entries: usize },

    #[error("Cluster version {version} is outside the window supported by module '{module}' ({bound}).")]
    VersionOutsideWindow {
        module: String,
        version: u32,
        bound: String,
    },

    #[error("Modules '{a}' and '{b}' are incompatible with each other.")]
    IncompatibleModules { a: String, b: String },

    #[error("Module '{module}' requires the starburst distribution.")]
    EnterpriseModule { module: String },

    #[error("Module '{module}' declares a non-integer default port '{value}'.")]
    InvalidDefaultPort { module: String, value: String },

    #[error("No available host port for {var} in range {start}..{end}.")]
    NoAvailablePort { var: String, start: u16, end: u32 },
}

impl UserError {
    /// Optional one-line hint printed after the error message.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            UserError::InvalidEnvPair(_) => Some("pass --env KEY=VALUE, e.g. --env PORT_TRINO=8080"),
            UserError::MissingLibrary(_) | UserError::MissingLibraryDefaults { .. } => {
                Some("install the module library or point QUARRY_LIB_PATH at it")
            }
            UserError::UnknownModule { .. } => Some("run 'quarry modules' to list what is installed"),
            UserError::EnterpriseModule { .. } => {
                Some("provision with --dist starburst to use enterprise modules")
            }
            UserError::NoAvailablePort { .. } => {
                Some("free some listeners or stop stale containers, then retry")
            }
            _ => None,
        }
    }
}
