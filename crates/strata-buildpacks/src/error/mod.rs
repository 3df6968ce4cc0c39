//! Domain errors raised while loading documents and running buildpacks.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! and TOML parse errors are boxed to satisfy the `result_large_err` Clippy
//! lint.
//!
//! Every variant has a fixed [`FaultOrigin`]: either the buildpack reported
//! failure, or the machinery around it did. The lifecycle uses that tag to
//! pick its exit code, so the mapping is an exhaustive match rather than a
//! runtime type test.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Who is responsible for a [`BuildpackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// The buildpack ran and did not satisfy its build.
    Buildpack,
    /// The lifecycle, host, or inputs failed.
    Platform,
}

/// Errors arising from buildpack documents and execution.
#[derive(Debug, Error)]
pub enum BuildpackError {
    /// The buildpack exited unsuccessfully.
    #[error("buildpack '{id}' failed with {}", describe_status(.status))]
    Failed {
        /// Buildpack identifier.
        id: String,
        /// Exit code, or `None` when terminated by a signal.
        status: Option<i32>,
    },

    /// The buildpack wrote a launch document that cannot be parsed.
    #[error("buildpack '{id}' wrote invalid launch metadata {path}: {source}")]
    InvalidLaunch {
        /// Buildpack identifier.
        id: String,
        /// Path of the launch document.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The buildpack has no `bin/build` executable.
    #[error("buildpack '{id}' build executable not found: {path}")]
    MissingExecutable {
        /// Buildpack identifier.
        id: String,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The buildpack process could not be spawned.
    #[error("buildpack '{id}' failed to start: {source}")]
    Spawn {
        /// Buildpack identifier.
        id: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A filesystem operation around a buildpack failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A buildpack group document exists but could not be read.
    #[error("failed to read buildpack group {path}: {source}")]
    GroupRead {
        /// Group document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A buildpack group document is malformed.
    #[error("failed to parse buildpack group {path}: {source}")]
    GroupParse {
        /// Group document path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The build plan could not be read.
    #[error("failed to read build plan {path}: {source}")]
    PlanRead {
        /// Plan document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The build plan is malformed.
    #[error("failed to parse build plan {path}: {source}")]
    PlanParse {
        /// Plan document path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A document could not be rendered as TOML.
    #[error("failed to serialise {document}: {source}")]
    Serialize {
        /// Document being rendered.
        document: &'static str,
        /// Underlying serialisation error.
        #[source]
        source: toml::ser::Error,
    },

    /// Build metadata could not be written.
    #[error("failed to write build metadata {path}: {source}")]
    MetadataWrite {
        /// Metadata document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl BuildpackError {
    /// Returns who is responsible for this failure.
    #[must_use]
    pub const fn origin(&self) -> FaultOrigin {
        match self {
            Self::Failed { .. } | Self::InvalidLaunch { .. } => FaultOrigin::Buildpack,
            Self::MissingExecutable { .. }
            | Self::Spawn { .. }
            | Self::Io { .. }
            | Self::GroupRead { .. }
            | Self::GroupParse { .. }
            | Self::PlanRead { .. }
            | Self::PlanParse { .. }
            | Self::Serialize { .. }
            | Self::MetadataWrite { .. } => FaultOrigin::Platform,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    status.map_or_else(
        || String::from("termination by signal"),
        |code| format!("exit status {code}"),
    )
}
