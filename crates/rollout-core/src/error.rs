//! Error types for rollout

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for rollout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rollout
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// A release with this id already exists under the releases directory
    #[error("Release '{id}' already exists")]
    #[diagnostic(help("Release ids must be unique per target. Wait a second or pass a different --id"))]
    DuplicateRelease { id: String },

    /// The release is unknown or has been pruned
    #[error("Release '{id}' not found")]
    #[diagnostic(help("Run `rollout list <target>` to see the available releases"))]
    ReleaseNotFound { id: String },

    /// Rollback requested to the release that is already live
    #[error("Release '{id}' is already live")]
    AlreadyActive { id: String },

    /// Nothing older than the live release is left to roll back to
    #[error("No previous release to roll back to for target '{target}'")]
    #[diagnostic(help("Older releases may have been pruned; pass an explicit release id"))]
    NoPreviousRelease { target: String },

    /// Release id contains characters that cannot name a directory safely
    #[error("Invalid release id '{id}': {reason}")]
    #[diagnostic(help("Use only letters, digits, '.', '_' and '-', not starting with '.'"))]
    InvalidReleaseId { id: String, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// File transfer into a release failed
    #[error("Transfer error: {message}")]
    Transfer {
        message: String,
        #[help]
        help: String,
    },

    /// Service reload hook failed
    #[error("Service error: {message}")]
    Service {
        message: String,
        #[help]
        help: String,
    },

    /// Activation history could not be read or written
    #[error("State error: {message}")]
    State {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a duplicate release error
    pub fn duplicate_release(id: impl Into<String>) -> Self {
        Self::DuplicateRelease { id: id.into() }
    }

    /// Create a release not found error
    pub fn release_not_found(id: impl Into<String>) -> Self {
        Self::ReleaseNotFound { id: id.into() }
    }

    /// Create an invalid release id error
    pub fn invalid_release_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReleaseId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a transfer error
    pub fn transfer(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Transfer {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a service error
    pub fn service(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
            help: help.into(),
        }
    }
}
