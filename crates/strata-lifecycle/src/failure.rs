//! Classified build failures and the exit codes they map to.
//!
//! Every fault leaving the orchestrator is a [`BuildFailure`]. The variant,
//! not the message, decides the process exit code, so a buildpack that
//! rejects the application and a disk that refuses a write can never be
//! confused even when both happen in the same stage.

use std::error::Error as StdError;
use std::process::ExitCode;

use strata_api::Version;
use strata_buildpacks::{BuildpackError, FaultOrigin};
use strum::Display;
use thiserror::Error;

/// Boxed cause carried by stage-scoped failures.
pub type FailureSource = Box<dyn StdError + Send + Sync + 'static>;

/// Build stage in which a failure arose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Loading the group and plan documents.
    ReadInputs,
    /// Gating declared APIs against the supported ones.
    VerifyApis,
    /// Probing or dropping the process identity.
    Privileges,
    /// Running the stack group under the snapshotter.
    StackBuild,
    /// Running the app group.
    Build,
    /// Delegating the app group to the unprivileged stage.
    HandOff,
    /// Persisting build metadata.
    WriteMetadata,
}

/// Process exit statuses reported by the lifecycle binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// The build completed.
    Success = 0,
    /// Telemetry or another bootstrap step failed.
    Failure = 1,
    /// Arguments, declared APIs, or the privilege policy were rejected.
    InvalidArguments = 3,
    /// A buildpack failed the build.
    BuildpackFailed = 51,
    /// The lifecycle failed around the buildpacks.
    BuildError = 52,
}

impl ExitStatus {
    /// Numeric exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// A classified failure of one build invocation.
#[derive(Debug, Error)]
pub enum BuildFailure {
    /// Configuration or arguments were rejected.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// What was wrong.
        message: String,
    },
    /// A declared API is not served by this lifecycle.
    #[error(
        "{}: {subject} declares API {declared}, which this lifecycle does not support (supports {supported})",
        Stage::VerifyApis
    )]
    VersionIncompatible {
        /// Platform or buildpack that declared the API.
        subject: String,
        /// Declared version.
        declared: Version,
        /// Version this lifecycle implements.
        supported: Version,
    },
    /// Elevated privilege and stack buildpacks do not agree.
    #[error("privilege policy violation: {reason}")]
    PrivilegePolicyViolation {
        /// Why the combination was refused.
        reason: String,
    },
    /// A buildpack ran and reported failure.
    #[error("{stage}: buildpack failed: {source}")]
    Buildpack {
        /// Stage in which the buildpack ran.
        stage: Stage,
        /// Underlying cause.
        #[source]
        source: FailureSource,
    },
    /// The lifecycle, host, or inputs failed.
    #[error("{stage}: {source}")]
    Infrastructure {
        /// Stage that failed.
        stage: Stage,
        /// Underlying cause.
        #[source]
        source: FailureSource,
    },
}

impl BuildFailure {
    /// Classifies a buildpack-layer error raised during `stage`.
    ///
    /// ```
    /// use strata_buildpacks::BuildpackError;
    /// use strata_lifecycle::{BuildFailure, ExitStatus, Stage};
    ///
    /// let failure = BuildFailure::at(
    ///     Stage::Build,
    ///     BuildpackError::Failed { id: "acme/node".into(), status: Some(1) },
    /// );
    /// assert_eq!(failure.exit_status(), ExitStatus::BuildpackFailed);
    /// ```
    #[must_use]
    pub fn at(stage: Stage, error: BuildpackError) -> Self {
        match error.origin() {
            FaultOrigin::Buildpack => Self::Buildpack {
                stage,
                source: Box::new(error),
            },
            FaultOrigin::Platform => Self::infrastructure(stage, error),
        }
    }

    /// Wraps a non-buildpack fault raised during `stage`.
    #[must_use]
    pub fn infrastructure(stage: Stage, source: impl Into<FailureSource>) -> Self {
        Self::Infrastructure {
            stage,
            source: source.into(),
        }
    }

    /// Stage the failure is attributed to, when it has one.
    ///
    /// API gating failures belong to [`Stage::VerifyApis`]; argument and
    /// policy rejections happen before any stage.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Buildpack { stage, .. } | Self::Infrastructure { stage, .. } => Some(*stage),
            Self::VersionIncompatible { .. } => Some(Stage::VerifyApis),
            Self::InvalidArguments { .. } | Self::PrivilegePolicyViolation { .. } => None,
        }
    }

    /// Exit status for this classification.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        match self {
            Self::InvalidArguments { .. }
            | Self::VersionIncompatible { .. }
            | Self::PrivilegePolicyViolation { .. } => ExitStatus::InvalidArguments,
            Self::Buildpack { .. } => ExitStatus::BuildpackFailed,
            Self::Infrastructure { .. } => ExitStatus::BuildError,
        }
    }
}
