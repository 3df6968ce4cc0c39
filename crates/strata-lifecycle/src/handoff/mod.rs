//! Delegation of the app group to an unprivileged process.
//!
//! After a stack build the orchestrator is still root. Rather than dropping
//! privileges in a process that has already run root-owned code, it launches
//! the narrower `strata-app-build` stage as the build user and waits for it.
//! The stage receives paths only; it re-reads every document itself.

use std::env;
use std::ffi::OsString;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus as ProcessStatus, Stdio};
use std::sync::Arc;

use strata_api::Version;
use strata_config::{BuildConfig, LoggingConfig};
use strata_priv::Credential;
use thiserror::Error;
use tracing::info;

use crate::failure::{BuildFailure, ExitStatus, Stage};

const HANDOFF_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handoff");

/// Name of the app build stage binary.
pub const APP_BUILD_BINARY: &str = "strata-app-build";

/// Environment variable overriding the app build stage binary.
pub const APP_BUILD_BIN_ENV: &str = "STRATA_APP_BUILD_BIN";

/// Errors raised while delegating to the app build stage.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// The stage binary could not be started.
    #[error("failed to launch {}: {source}", .binary.display())]
    Launch {
        /// Binary that was invoked.
        binary: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The stage exited unsuccessfully.
    #[error("{} exited with {}", .binary.display(), describe(.status))]
    Exited {
        /// Binary that was invoked.
        binary: PathBuf,
        /// Exit code, or `None` when terminated by a signal.
        status: Option<i32>,
    },
}

fn describe(status: &Option<i32>) -> String {
    status.map_or_else(
        || String::from("termination by signal"),
        |code| format!("exit status {code}"),
    )
}

/// Paths and API version the app build stage needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStageArgs {
    /// Directory holding installed buildpacks.
    pub buildpacks_dir: PathBuf,
    /// App group document.
    pub group_path: PathBuf,
    /// Build plan document.
    pub plan_path: PathBuf,
    /// Directory receiving layers.
    pub layers_dir: PathBuf,
    /// Application source directory.
    pub app_dir: PathBuf,
    /// Platform directory.
    pub platform_dir: PathBuf,
    /// Platform API declared by the platform.
    pub platform_api: Version,
}

impl AppStageArgs {
    /// Extracts the stage arguments from a resolved configuration.
    #[must_use]
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            buildpacks_dir: config.buildpacks_dir().into(),
            group_path: config.group_path().into(),
            plan_path: config.plan_path().into(),
            layers_dir: config.layers_dir().into(),
            app_dir: config.app_dir().into(),
            platform_dir: config.platform_dir().into(),
            platform_api: config.platform_api(),
        }
    }

    /// Renders the flags `strata-app-build` accepts.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let paths: [(&str, &Path); 6] = [
            ("--buildpacks", &self.buildpacks_dir),
            ("--group", &self.group_path),
            ("--plan", &self.plan_path),
            ("--layers", &self.layers_dir),
            ("--app", &self.app_dir),
            ("--platform", &self.platform_dir),
        ];
        let mut args = Vec::with_capacity(paths.len() * 2 + 2);
        for (flag, path) in paths {
            args.push(OsString::from(flag));
            args.push(path.as_os_str().to_owned());
        }
        args.push(OsString::from("--platform-api"));
        args.push(OsString::from(self.platform_api.to_string()));
        args
    }
}

/// One delegation of the app group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    /// Identity the stage runs as.
    pub credential: Credential,
    /// Stage arguments.
    pub args: AppStageArgs,
}

impl HandoffRequest {
    /// Builds the request for `config`.
    #[must_use]
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            credential: config.credential(),
            args: AppStageArgs::from_config(config),
        }
    }

    /// Full argument vector, including the identity flags the stage
    /// validates.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = self.args.to_args();
        args.extend([
            OsString::from("--uid"),
            OsString::from(self.credential.uid().to_string()),
            OsString::from("--gid"),
            OsString::from(self.credential.gid().to_string()),
        ]);
        args
    }
}

/// Runs the app group somewhere other than the current process.
pub trait StageHandoff {
    /// Runs the app build stage and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BuildFailure::Buildpack`] when a buildpack failed inside the
    /// stage and [`BuildFailure::Infrastructure`] for any other failure.
    fn hand_off(&self, request: &HandoffRequest) -> Result<(), BuildFailure>;
}

/// [`StageHandoff`] that re-executes the app build stage binary.
#[derive(Debug, Clone)]
pub struct ReexecHandoff {
    binary: PathBuf,
    logging: Option<LoggingConfig>,
}

impl ReexecHandoff {
    /// Uses `binary` as the stage executable.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            logging: None,
        }
    }

    /// Resolves the stage binary: `STRATA_APP_BUILD_BIN`, then the sibling of
    /// the running executable, then a `PATH` lookup.
    #[must_use]
    pub fn locate() -> Self {
        Self::new(resolve_stage_binary(
            env::var_os(APP_BUILD_BIN_ENV),
            env::current_exe().ok(),
        ))
    }

    /// Forwards logging settings to the stage through its environment.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Stage executable.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

fn resolve_stage_binary(override_bin: Option<OsString>, current_exe: Option<PathBuf>) -> PathBuf {
    override_bin
        .map(PathBuf::from)
        .or_else(|| {
            current_exe
                .as_deref()
                .and_then(Path::parent)
                .map(|dir| dir.join(APP_BUILD_BINARY))
        })
        .unwrap_or_else(|| PathBuf::from(APP_BUILD_BINARY))
}

impl StageHandoff for ReexecHandoff {
    fn hand_off(&self, request: &HandoffRequest) -> Result<(), BuildFailure> {
        let mut command = Command::new(&self.binary);
        command
            .args(request.to_args())
            .uid(request.credential.uid())
            .gid(request.credential.gid())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(logging) = &self.logging {
            command
                .env("STRATA_LOG", logging.filter())
                .env("STRATA_LOG_FORMAT", logging.format().to_string());
        }

        info!(
            target: HANDOFF_TARGET,
            binary = %self.binary.display(),
            credential = %request.credential,
            "handing app build to unprivileged stage"
        );
        let status = command.status().map_err(|source| {
            BuildFailure::infrastructure(
                Stage::HandOff,
                HandoffError::Launch {
                    binary: self.binary.clone(),
                    source: Arc::new(source),
                },
            )
        })?;
        classify_exit(&self.binary, status)
    }
}

/// Maps the stage's exit status onto the orchestrator's classification.
fn classify_exit(binary: &Path, status: ProcessStatus) -> Result<(), BuildFailure> {
    if status.success() {
        return Ok(());
    }
    let code = status.code();
    let error = HandoffError::Exited {
        binary: binary.to_path_buf(),
        status: code,
    };
    if code == Some(i32::from(ExitStatus::BuildpackFailed.code())) {
        Err(BuildFailure::Buildpack {
            stage: Stage::HandOff,
            source: Box::new(error),
        })
    } else {
        Err(BuildFailure::infrastructure(Stage::HandOff, error))
    }
}
