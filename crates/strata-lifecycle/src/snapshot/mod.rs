//! Stack builds wrapped in a filesystem snapshot.
//!
//! Stack buildpacks change the base image itself, so their effect is
//! captured by an external snapshot tool: the tool is primed before the
//! stack group runs and asked for the difference afterwards. The diff
//! algorithm stays outside the lifecycle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use strata_buildpacks::{
    BuildContext, BuildPlan, BuildpackExecutor, BuildpackGroup, BuildpackRef, GroupRunner,
};
use thiserror::Error;
use tracing::info;

use crate::failure::{BuildFailure, Stage};

const SNAPSHOT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::snapshot");

/// Directory beneath the layers directory that receives the snapshot.
pub const STACK_DIR: &str = "stack";

/// File name of the captured stack snapshot.
pub const SNAPSHOT_FILE: &str = "snapshot.tar";

/// Errors raised by snapshot tooling.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Stack buildpacks are present but no snapshot tool was configured.
    #[error("stack buildpacks require a snapshot tool, but none is configured")]
    NotConfigured,
    /// A snapshot was requested before the tool was primed.
    #[error("snapshot requested before the snapshotter was initialised")]
    NotInitialised,
    /// The snapshot tool could not be started.
    #[error("failed to launch snapshot tool {}: {source}", .tool.display())]
    Launch {
        /// Tool that was invoked.
        tool: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The snapshot tool reported failure.
    #[error("snapshot tool {} {action} exited with {}", .tool.display(), describe(.status))]
    Failed {
        /// Tool that was invoked.
        tool: PathBuf,
        /// Sub-command that failed.
        action: &'static str,
        /// Exit code, or `None` when terminated by a signal.
        status: Option<i32>,
    },
    /// The snapshot output directory could not be prepared.
    #[error("failed to prepare snapshot directory {}: {source}", .path.display())]
    Prepare {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

fn describe(status: &Option<i32>) -> String {
    status.map_or_else(|| String::from("a signal"), |code| format!("status {code}"))
}

/// Captures the filesystem changes made by stack buildpacks.
pub trait Snapshotter {
    /// Records the state of `root` before the stack group runs.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the tool cannot be primed.
    fn init(&mut self, root: &Path) -> Result<(), SnapshotError>;

    /// Writes the changes since [`Snapshotter::init`] to `output`.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the snapshot cannot be taken.
    fn take_snapshot(&mut self, output: &Path) -> Result<(), SnapshotError>;
}

/// [`Snapshotter`] that shells out to a snapshot tool.
///
/// The tool is invoked as `<tool> init <root>` and later as
/// `<tool> snapshot <root> <output>`.
#[derive(Debug, Clone)]
pub struct ExternalSnapshotter {
    tool: PathBuf,
    root: Option<PathBuf>,
}

impl ExternalSnapshotter {
    /// Creates a snapshotter backed by `tool`.
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            root: None,
        }
    }

    /// Path of the snapshot tool.
    #[must_use]
    pub fn tool(&self) -> &Path {
        &self.tool
    }

    fn invoke(&self, action: &'static str, args: &[&Path]) -> Result<(), SnapshotError> {
        let status = Command::new(&self.tool)
            .arg(action)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| SnapshotError::Launch {
                tool: self.tool.clone(),
                source: Arc::new(source),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(SnapshotError::Failed {
                tool: self.tool.clone(),
                action,
                status: status.code(),
            })
        }
    }
}

impl Snapshotter for ExternalSnapshotter {
    fn init(&mut self, root: &Path) -> Result<(), SnapshotError> {
        self.invoke("init", &[root])?;
        self.root = Some(root.to_path_buf());
        Ok(())
    }

    fn take_snapshot(&mut self, output: &Path) -> Result<(), SnapshotError> {
        let root = self.root.clone().ok_or(SnapshotError::NotInitialised)?;
        self.invoke("snapshot", &[&root, output])
    }
}

/// Result of a successful stack build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutcome {
    /// Stack buildpacks in the order they ran.
    pub buildpacks: Vec<BuildpackRef>,
    /// Snapshot archive written by the snapshotter.
    pub snapshot: PathBuf,
}

/// Runs the stack group with elevated privilege.
pub trait StackBuilder {
    /// Builds `group` and captures its filesystem changes.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildFailure`] classified under [`Stage::StackBuild`].
    fn stack_build(
        &mut self,
        group: &BuildpackGroup,
        plan: &BuildPlan,
        context: &BuildContext,
    ) -> Result<StackOutcome, BuildFailure>;
}

/// [`StackBuilder`] that brackets the stack group with snapshot calls.
#[derive(Debug)]
pub struct SnapshottingStackBuilder<S, X> {
    snapshotter: Option<S>,
    executor: X,
    root: PathBuf,
}

impl<S, X> SnapshottingStackBuilder<S, X> {
    /// Creates a builder snapshotting the filesystem root.
    ///
    /// Without a snapshotter every stack build fails before any buildpack
    /// runs.
    #[must_use]
    pub fn new(snapshotter: Option<S>, executor: X) -> Self {
        Self {
            snapshotter,
            executor,
            root: PathBuf::from("/"),
        }
    }

    /// Snapshots `root` instead of the filesystem root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

impl<S: Snapshotter, X: BuildpackExecutor> StackBuilder for SnapshottingStackBuilder<S, X> {
    fn stack_build(
        &mut self,
        group: &BuildpackGroup,
        plan: &BuildPlan,
        context: &BuildContext,
    ) -> Result<StackOutcome, BuildFailure> {
        let failure = |error: SnapshotError| BuildFailure::infrastructure(Stage::StackBuild, error);
        let snapshotter = self
            .snapshotter
            .as_mut()
            .ok_or_else(|| failure(SnapshotError::NotConfigured))?;

        let stack_dir = context.layers_dir().join(STACK_DIR);
        fs::create_dir_all(&stack_dir).map_err(|source| {
            failure(SnapshotError::Prepare {
                path: stack_dir.clone(),
                source: Arc::new(source),
            })
        })?;
        snapshotter.init(&self.root).map_err(failure)?;

        let metadata = GroupRunner::new(&self.executor)
            .run(group, plan, context)
            .map_err(|error| BuildFailure::at(Stage::StackBuild, error))?;

        let snapshot = stack_dir.join(SNAPSHOT_FILE);
        snapshotter.take_snapshot(&snapshot).map_err(failure)?;
        info!(
            target: SNAPSHOT_TARGET,
            buildpacks = metadata.buildpacks.len(),
            snapshot = %snapshot.display(),
            "stack build captured"
        );
        Ok(StackOutcome {
            buildpacks: metadata.buildpacks,
            snapshot,
        })
    }
}
