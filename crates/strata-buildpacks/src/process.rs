//! Process-based buildpack execution.
//!
//! [`ProcessExecutor`] implements the [`BuildpackExecutor`] trait by running
//! a buildpack's `bin/build` executable:
//!
//! ```text
//! <buildpacks>/<escaped id>/<version>/bin/build <layers>/<escaped id> <platform> <plan>
//! ```
//!
//! The plan is written to a temporary file for the duration of the call. The
//! child runs in the app directory with the context environment only, and
//! inherits the lifecycle's standard streams so buildpack output reaches the
//! platform unmodified.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::descriptor::BuildpackDescriptor;
use crate::error::BuildpackError;
use crate::metadata::LaunchDocument;
use crate::plan::BuildPlan;
use crate::runner::{BuildContext, BuildpackExecutor, BuildpackReport};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Executes buildpacks as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl BuildpackExecutor for ProcessExecutor {
    fn build(
        &self,
        buildpack: &BuildpackDescriptor,
        plan: &BuildPlan,
        context: &BuildContext,
    ) -> Result<BuildpackReport, BuildpackError> {
        let id = buildpack.id();
        let buildpack_dir = buildpack_dir(buildpack, context);
        let executable = buildpack_dir.join("bin").join("build");
        if !executable.is_file() {
            return Err(BuildpackError::MissingExecutable {
                id: id.to_owned(),
                path: executable,
            });
        }

        let layers = context.layers_dir().join(buildpack.escaped_id());
        fs::create_dir_all(&layers).map_err(|source| BuildpackError::io(&layers, source))?;
        let plan_file = write_plan(plan)?;

        debug!(
            target: PROCESS_TARGET,
            buildpack = id,
            executable = %executable.display(),
            layers = %layers.display(),
            "spawning buildpack build"
        );

        let status = Command::new(&executable)
            .arg(&layers)
            .arg(context.platform_dir())
            .arg(plan_file.path())
            .current_dir(context.app_dir())
            .env_clear()
            .envs(context.env().iter().map(|(key, value)| (key, value)))
            .env("CNB_BUILDPACK_DIR", &buildpack_dir)
            .env("CNB_PLATFORM_API", context.platform_api().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| BuildpackError::Spawn {
                id: id.to_owned(),
                source: Arc::new(source),
            })?;

        debug!(target: PROCESS_TARGET, buildpack = id, ?status, "buildpack exited");
        if !status.success() {
            return Err(BuildpackError::Failed {
                id: id.to_owned(),
                status: status.code(),
            });
        }

        let launch = read_launch(id, &layers.join("launch.toml"))?;
        Ok(BuildpackReport {
            processes: launch.processes,
        })
    }
}

fn buildpack_dir(buildpack: &BuildpackDescriptor, context: &BuildContext) -> PathBuf {
    context
        .buildpacks_dir()
        .join(buildpack.escaped_id())
        .join(buildpack.version())
}

fn write_plan(plan: &BuildPlan) -> Result<NamedTempFile, BuildpackError> {
    let document = plan.to_toml_string()?;
    let mut file = NamedTempFile::new()
        .map_err(|source| BuildpackError::io(std::env::temp_dir(), source))?;
    file.write_all(document.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|source| BuildpackError::io(file.path(), source))?;
    Ok(file)
}

/// Reads the optional `launch.toml` a buildpack leaves in its layers.
fn read_launch(id: &str, path: &Path) -> Result<LaunchDocument, BuildpackError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(LaunchDocument::default());
        }
        Err(source) => return Err(BuildpackError::io(path, source)),
    };
    toml::from_str(&text).map_err(|source| BuildpackError::InvalidLaunch {
        id: id.to_owned(),
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}
