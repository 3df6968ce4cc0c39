//! Build metadata handed to the export phase.

use serde::{Deserialize, Serialize};

use crate::descriptor::BuildpackDescriptor;

/// A buildpack that contributed to the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackRef {
    /// Buildpack identifier.
    pub id: String,
    /// Buildpack version.
    pub version: String,
}

impl From<&BuildpackDescriptor> for BuildpackRef {
    fn from(descriptor: &BuildpackDescriptor) -> Self {
        Self {
            id: descriptor.id().to_owned(),
            version: descriptor.version().to_owned(),
        }
    }
}

/// A launchable process declared by a buildpack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process type, such as `web`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Command to execute.
    pub command: String,
    /// Arguments appended to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Whether the command bypasses the shell.
    #[serde(default)]
    pub direct: bool,
}

/// The `launch.toml` document a buildpack may leave in its layers directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LaunchDocument {
    /// Processes the buildpack contributes.
    #[serde(default)]
    pub processes: Vec<Process>,
}

/// Record of a successful app build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Buildpacks in the order they ran.
    #[serde(default)]
    pub buildpacks: Vec<BuildpackRef>,
    /// Launch processes; a later buildpack replaces an earlier one's type.
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl BuildMetadata {
    /// Records a buildpack and merges its processes.
    pub fn record(&mut self, buildpack: BuildpackRef, processes: Vec<Process>) {
        self.buildpacks.push(buildpack);
        for process in processes {
            match self
                .processes
                .iter_mut()
                .find(|existing| existing.kind == process.kind)
            {
                Some(existing) => *existing = process,
                None => self.processes.push(process),
            }
        }
    }
}
