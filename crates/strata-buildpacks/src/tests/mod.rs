//! Crate-level integration and BDD tests.

use std::cell::RefCell;

use strata_api::Version;

use crate::descriptor::BuildpackDescriptor;
use crate::error::BuildpackError;
use crate::metadata::Process;
use crate::plan::BuildPlan;
use crate::runner::{BuildContext, BuildpackExecutor, BuildpackReport};


/// Executor double that records invocations and fails a chosen buildpack.
#[derive(Default)]
pub(crate) struct RecordingExecutor {
    pub(crate) invoked: RefCell<Vec<String>>,
    pub(crate) fail_on: Option<String>,
}

impl RecordingExecutor {
    pub(crate) fn failing_on(id: &str) -> Self {
        Self {
            invoked: RefCell::default(),
            fail_on: Some(id.to_owned()),
        }
    }
}

impl BuildpackExecutor for RecordingExecutor {
    fn build(
        &self,
        buildpack: &BuildpackDescriptor,
        _plan: &BuildPlan,
        _context: &BuildContext,
    ) -> Result<BuildpackReport, BuildpackError> {
        self.invoked.borrow_mut().push(buildpack.id().to_owned());
        if self.fail_on.as_deref() == Some(buildpack.id()) {
            return Err(BuildpackError::Failed {
                id: buildpack.id().to_owned(),
                status: Some(1),
            });
        }
        Ok(BuildpackReport {
            processes: vec![Process {
                kind: String::from("web"),
                command: format!("{}-start", buildpack.escaped_id()),
                args: Vec::new(),
                direct: false,
            }],
        })
    }
}

pub(crate) fn descriptor(id: &str) -> BuildpackDescriptor {
    BuildpackDescriptor::new(id, "1.0", Version::new(0, 2))
}

pub(crate) fn context() -> BuildContext {
    BuildContext::new(
        "/cnb/buildpacks",
        "/layers",
        "/workspace",
        "/platform",
        Version::new(0, 3),
    )
}
