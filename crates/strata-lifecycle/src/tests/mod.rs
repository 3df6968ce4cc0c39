//! Shared doubles and fixtures for lifecycle tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mockall::mock;
use strata_buildpacks::{
    BuildContext, BuildPlan, BuildpackDescriptor, BuildpackError, BuildpackExecutor,
    BuildpackGroup, BuildpackReport,
};
use strata_priv::{Credential, EnvironmentOverlay, PrivilegeError, Privileges};

use crate::failure::BuildFailure;
use crate::handoff::{HandoffRequest, StageHandoff};
use crate::snapshot::{SnapshotError, Snapshotter, StackBuilder, StackOutcome};


mock! {
    pub Executor {}
    impl BuildpackExecutor for Executor {
        fn build(
            &self,
            buildpack: &BuildpackDescriptor,
            plan: &BuildPlan,
            context: &BuildContext,
        ) -> Result<BuildpackReport, BuildpackError>;
    }
}

mock! {
    pub Identity {}
    impl Privileges for Identity {
        fn is_privileged(&self) -> bool;
        fn drop_to(&mut self, credential: Credential) -> Result<(), PrivilegeError>;
        fn environment_for(&self, uid: u32) -> Result<EnvironmentOverlay, PrivilegeError>;
    }
}

mock! {
    pub Stack {}
    impl StackBuilder for Stack {
        fn stack_build(
            &mut self,
            group: &BuildpackGroup,
            plan: &BuildPlan,
            context: &BuildContext,
        ) -> Result<StackOutcome, BuildFailure>;
    }
}

mock! {
    pub Handoff {}
    impl StageHandoff for Handoff {
        fn hand_off(&self, request: &HandoffRequest) -> Result<(), BuildFailure>;
    }
}

mock! {
    pub SnapshotTool {}
    impl Snapshotter for SnapshotTool {
        fn init(&mut self, root: &Path) -> Result<(), SnapshotError>;
        fn take_snapshot(&mut self, output: &Path) -> Result<(), SnapshotError>;
    }
}

/// Writes an executable shell script named `name` into `dir`.
pub(crate) fn install_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Writes a group document listing `ids` at `path`.
pub(crate) fn write_group(path: &Path, ids: &[&str]) {
    let body: String = ids
        .iter()
        .map(|id| format!("[[group]]\nid = \"{id}\"\nversion = \"1.0\"\napi = \"0.2\"\n\n"))
        .collect();
    fs::write(path, body).expect("write group");
}
