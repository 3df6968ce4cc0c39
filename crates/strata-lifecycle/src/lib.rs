//! Build phase orchestration for the Strata buildpack lifecycle.
//!
//! The crate wires the leaf crates into the two lifecycle binaries:
//!
//! - `strata-build` loads the app and stack groups, gates their declared
//!   APIs, runs stack buildpacks as root under a snapshotter, and hands the
//!   app group to `strata-app-build` running as the build user.
//! - `strata-app-build` is that narrower stage. It never sees a stack group:
//!   it drops to the build user in place, runs the app group, and writes the
//!   build metadata.
//!
//! Every failure is a [`BuildFailure`] whose variant selects the exit code.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use strata_buildpacks::process::ProcessExecutor;
use strata_config::{BuildConfig, ConfigError};
use strata_priv::SystemPrivileges;
use tracing::{error, info};

mod failure;
pub mod handoff;
pub mod orchestrator;
pub mod snapshot;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use failure::{BuildFailure, ExitStatus, FailureSource, Stage};
pub use handoff::{AppStageArgs, HandoffRequest, ReexecHandoff, StageHandoff};
pub use orchestrator::{BuildOutcome, ExecutionPath, Orchestrator};
pub use snapshot::{ExternalSnapshotter, SnapshottingStackBuilder, Snapshotter, StackBuilder};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Runs `strata-build` with the given arguments.
///
/// Help and version output go to `stdout`; configuration and telemetry
/// failures are reported on `stderr`. Build failures are logged through
/// `tracing`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    match BuildConfig::load_from_iter(args) {
        Ok(config) => execute(&config, stderr),
        Err(error) => report_config_error(&error, stdout, stderr),
    }
}

/// Runs `strata-app-build` with the given arguments.
///
/// The stage accepts no stack group, so it always takes the in-place app
/// path or refuses to run as root.
pub fn run_app_stage<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    match BuildConfig::load_app_stage_from_iter(args) {
        Ok(config) => execute(&config, stderr),
        Err(error) => report_config_error(&error, stdout, stderr),
    }
}

fn execute<E: Write>(config: &BuildConfig, stderr: &mut E) -> ExitCode {
    if let Err(error) = telemetry::initialise(config.logging()) {
        let _ = writeln!(stderr, "{error}");
        return ExitStatus::Failure.into();
    }

    let snapshotter = config.snapshotter().map(ExternalSnapshotter::new);
    let handoff = ReexecHandoff::locate().with_logging(config.logging().clone());
    let mut orchestrator = Orchestrator::new(
        SystemPrivileges::new(),
        SnapshottingStackBuilder::new(snapshotter, ProcessExecutor),
        handoff,
        ProcessExecutor,
    );

    match orchestrator.run(config) {
        Ok(outcome) => {
            info!(target: LIFECYCLE_TARGET, path = ?outcome.path, "build complete");
            ExitStatus::Success.into()
        }
        Err(failure) => {
            let stage = failure.stage().map(|stage| stage.to_string());
            error!(
                target: LIFECYCLE_TARGET,
                stage = stage.as_deref(),
                exit_code = failure.exit_status().code(),
                error = %failure,
                "build failed"
            );
            failure.exit_status().into()
        }
    }
}

fn report_config_error<W: Write, E: Write>(
    error: &ConfigError,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    if error.is_informational() {
        let _ = write!(stdout, "{error}");
        return ExitStatus::Success.into();
    }
    let _ = writeln!(stderr, "{error}");
    ExitStatus::InvalidArguments.into()
}
