//! Resolved build configuration.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use strata_api::Version;
use strata_priv::Credential;

use crate::cli::{AppBuildArgs, BuildArgs, StageArgs};
use crate::defaults::{GROUP_FILE, PLAN_FILE, STACK_GROUP_FILE};
use crate::error::ConfigError;
use crate::logging::LoggingConfig;

/// Configuration for one build invocation, with every default resolved.
///
/// # Example
///
/// ```
/// use strata_config::BuildConfig;
///
/// let config = BuildConfig::load_from_iter(["strata-build", "--uid", "1000", "--gid", "1000"])
///     .expect("valid arguments");
/// assert_eq!(config.group_path().as_str(), "/layers/group.toml");
/// assert_eq!(config.stack_group_path().map(|path| path.as_str()), Some("/layers/stack-group.toml"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    buildpacks_dir: Utf8PathBuf,
    group_path: Utf8PathBuf,
    stack_group_path: Option<Utf8PathBuf>,
    plan_path: Utf8PathBuf,
    layers_dir: Utf8PathBuf,
    app_dir: Utf8PathBuf,
    platform_dir: Utf8PathBuf,
    platform_api: Version,
    credential: Credential,
    snapshotter: Option<Utf8PathBuf>,
    logging: LoggingConfig,
}

impl BuildConfig {
    /// Parses `strata-build` arguments, falling back to the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] for unparseable or unexpected arguments
    /// and [`ConfigError::RootCredential`] when the build identity is root.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::from_build_args(BuildArgs::try_parse_from(args)?)
    }

    /// Parses `strata-app-build` arguments. The result carries no stack group
    /// and no snapshotter.
    ///
    /// # Errors
    ///
    /// As for [`BuildConfig::load_from_iter`].
    pub fn load_app_stage_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let AppBuildArgs { stage } = AppBuildArgs::try_parse_from(args)?;
        Self::resolve(stage, None, None)
    }

    /// Resolves parsed `strata-build` arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RootCredential`] when the build identity is
    /// root.
    pub fn from_build_args(args: BuildArgs) -> Result<Self, ConfigError> {
        let stack_group = args
            .stack_group_path
            .unwrap_or_else(|| args.stage.layers_dir.join(STACK_GROUP_FILE));
        Self::resolve(args.stage, Some(stack_group), args.snapshotter)
    }

    fn resolve(
        stage: StageArgs,
        stack_group_path: Option<Utf8PathBuf>,
        snapshotter: Option<Utf8PathBuf>,
    ) -> Result<Self, ConfigError> {
        let credential = Credential::new(stage.uid, stage.gid);
        if credential.is_root() {
            return Err(ConfigError::RootCredential { credential });
        }
        let group_path = stage
            .group_path
            .unwrap_or_else(|| stage.layers_dir.join(GROUP_FILE));
        let plan_path = stage
            .plan_path
            .unwrap_or_else(|| stage.layers_dir.join(PLAN_FILE));
        Ok(Self {
            buildpacks_dir: stage.buildpacks_dir,
            group_path,
            stack_group_path,
            plan_path,
            layers_dir: stage.layers_dir,
            app_dir: stage.app_dir,
            platform_dir: stage.platform_dir,
            platform_api: stage.platform_api,
            credential,
            snapshotter,
            logging: LoggingConfig::new(stage.log_filter, stage.log_format),
        })
    }

    /// Directory holding installed buildpacks.
    #[must_use]
    pub fn buildpacks_dir(&self) -> &Utf8Path {
        &self.buildpacks_dir
    }

    /// App group document.
    #[must_use]
    pub fn group_path(&self) -> &Utf8Path {
        &self.group_path
    }

    /// Stack group document, absent for the app build stage.
    #[must_use]
    pub fn stack_group_path(&self) -> Option<&Utf8Path> {
        self.stack_group_path.as_deref()
    }

    /// Build plan document.
    #[must_use]
    pub fn plan_path(&self) -> &Utf8Path {
        &self.plan_path
    }

    /// Directory receiving buildpack layers.
    #[must_use]
    pub fn layers_dir(&self) -> &Utf8Path {
        &self.layers_dir
    }

    /// Application source directory.
    #[must_use]
    pub fn app_dir(&self) -> &Utf8Path {
        &self.app_dir
    }

    /// Platform directory passed to buildpacks.
    #[must_use]
    pub fn platform_dir(&self) -> &Utf8Path {
        &self.platform_dir
    }

    /// Platform API declared by the platform.
    #[must_use]
    pub const fn platform_api(&self) -> Version {
        self.platform_api
    }

    /// Identity app buildpacks run as.
    #[must_use]
    pub const fn credential(&self) -> Credential {
        self.credential
    }

    /// Snapshot tool for stack builds, if configured.
    #[must_use]
    pub fn snapshotter(&self) -> Option<&Utf8Path> {
        self.snapshotter.as_deref()
    }

    /// Logging settings.
    #[must_use]
    pub const fn logging(&self) -> &LoggingConfig {
        &self.logging
    }
}
