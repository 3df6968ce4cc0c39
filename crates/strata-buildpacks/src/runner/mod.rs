//! Group execution orchestrated over a pluggable executor.
//!
//! The [`GroupRunner`] walks a [`BuildpackGroup`] in order, hands each
//! buildpack to a [`BuildpackExecutor`], and folds the reports into
//! [`BuildMetadata`]. The executor abstraction enables test doubles that
//! record invocations without spawning real processes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use strata_api::Version;
use tracing::{info, warn};

use crate::descriptor::{BuildpackDescriptor, BuildpackGroup};
use crate::error::BuildpackError;
use crate::metadata::{BuildMetadata, BuildpackRef, Process};
use crate::plan::BuildPlan;

const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

/// Directories and environment shared by every buildpack in a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    buildpacks_dir: PathBuf,
    layers_dir: PathBuf,
    app_dir: PathBuf,
    platform_dir: PathBuf,
    platform_api: Version,
    env: Vec<(OsString, OsString)>,
}

impl BuildContext {
    /// Creates a context with an empty environment.
    #[must_use]
    pub fn new(
        buildpacks_dir: impl Into<PathBuf>,
        layers_dir: impl Into<PathBuf>,
        app_dir: impl Into<PathBuf>,
        platform_dir: impl Into<PathBuf>,
        platform_api: Version,
    ) -> Self {
        Self {
            buildpacks_dir: buildpacks_dir.into(),
            layers_dir: layers_dir.into(),
            app_dir: app_dir.into(),
            platform_dir: platform_dir.into(),
            platform_api,
            env: Vec::new(),
        }
    }

    /// Replaces the environment buildpack processes receive.
    #[must_use]
    pub fn with_env(mut self, env: Vec<(OsString, OsString)>) -> Self {
        self.env = env;
        self
    }

    /// Directory holding installed buildpacks.
    #[must_use]
    pub fn buildpacks_dir(&self) -> &Path {
        &self.buildpacks_dir
    }

    /// Directory receiving buildpack layers.
    #[must_use]
    pub fn layers_dir(&self) -> &Path {
        &self.layers_dir
    }

    /// Application source directory; the buildpack working directory.
    #[must_use]
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Platform-provided directory passed to each buildpack.
    #[must_use]
    pub fn platform_dir(&self) -> &Path {
        &self.platform_dir
    }

    /// Platform API declared by the platform.
    #[must_use]
    pub const fn platform_api(&self) -> Version {
        self.platform_api
    }

    /// Environment buildpack processes receive.
    #[must_use]
    pub fn env(&self) -> &[(OsString, OsString)] {
        &self.env
    }
}

/// What a single buildpack contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildpackReport {
    /// Launch processes declared by the buildpack.
    pub processes: Vec<Process>,
}

/// Trait abstracting buildpack execution for testability.
///
/// The production implementation is
/// [`ProcessExecutor`](crate::process::ProcessExecutor).
pub trait BuildpackExecutor {
    /// Runs one buildpack's build step.
    ///
    /// # Errors
    ///
    /// Returns [`BuildpackError::Failed`] when the buildpack reports failure,
    /// or another variant when the execution machinery fails.
    fn build(
        &self,
        buildpack: &BuildpackDescriptor,
        plan: &BuildPlan,
        context: &BuildContext,
    ) -> Result<BuildpackReport, BuildpackError>;
}

impl<E: BuildpackExecutor + ?Sized> BuildpackExecutor for &E {
    fn build(
        &self,
        buildpack: &BuildpackDescriptor,
        plan: &BuildPlan,
        context: &BuildContext,
    ) -> Result<BuildpackReport, BuildpackError> {
        (**self).build(buildpack, plan, context)
    }
}

/// Runs buildpack groups through an executor.
///
/// # Example
///
/// ```
/// use strata_api::Version;
/// use strata_buildpacks::{
///     BuildContext, BuildPlan, BuildpackDescriptor, BuildpackError, BuildpackExecutor,
///     BuildpackGroup, BuildpackReport, GroupRunner,
/// };
///
/// struct Succeed;
/// impl BuildpackExecutor for Succeed {
///     fn build(
///         &self,
///         _buildpack: &BuildpackDescriptor,
///         _plan: &BuildPlan,
///         _context: &BuildContext,
///     ) -> Result<BuildpackReport, BuildpackError> {
///         Ok(BuildpackReport::default())
///     }
/// }
///
/// let group = BuildpackGroup::new(vec![BuildpackDescriptor::new("acme/node", "1.0", Version::new(0, 2))]);
/// let context = BuildContext::new("/cnb/buildpacks", "/layers", "/workspace", "/platform", Version::new(0, 3));
/// let metadata = GroupRunner::new(Succeed).run(&group, &BuildPlan::default(), &context).unwrap();
/// assert_eq!(metadata.buildpacks.len(), 1);
/// ```
#[derive(Debug)]
pub struct GroupRunner<E> {
    executor: E,
}

impl<E> GroupRunner<E> {
    /// Creates a runner over the given executor.
    #[must_use]
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: BuildpackExecutor> GroupRunner<E> {
    /// Runs every buildpack in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the executor.
    pub fn run(
        &self,
        group: &BuildpackGroup,
        plan: &BuildPlan,
        context: &BuildContext,
    ) -> Result<BuildMetadata, BuildpackError> {
        let mut metadata = BuildMetadata::default();
        for buildpack in group {
            info!(
                target: RUNNER_TARGET,
                buildpack = buildpack.id(),
                version = buildpack.version(),
                "running buildpack"
            );
            let report = self
                .executor
                .build(buildpack, plan, context)
                .inspect_err(|error| {
                    warn!(
                        target: RUNNER_TARGET,
                        buildpack = buildpack.id(),
                        %error,
                        "buildpack did not complete"
                    );
                })?;
            metadata.record(BuildpackRef::from(buildpack), report.processes);
        }
        Ok(metadata)
    }
}
