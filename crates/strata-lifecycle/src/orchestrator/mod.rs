//! The build phase state machine.
//!
//! A build moves through typed states: [`LoadedInputs`] once the documents
//! are read, [`ValidatedInputs`] once every declared API has been gated, and
//! then along one [`ExecutionPath`]. The path is a pure function of group
//! emptiness and the process identity, so the one illegal combination
//! (elevated privilege without stack buildpacks) is refused before any
//! buildpack runs.

use std::env;
use std::path::PathBuf;

use strata_api::ApiSupport;
use strata_buildpacks::documents::{read_group_optional, read_plan, write_metadata};
use strata_buildpacks::{
    BuildContext, BuildPlan, BuildpackError, BuildpackExecutor, BuildpackGroup, GroupRunner,
};
use strata_config::BuildConfig;
use strata_priv::{PrivilegeError, Privileges};
use tracing::{debug, info};

use crate::failure::{BuildFailure, Stage};
use crate::handoff::{HandoffRequest, StageHandoff};
use crate::snapshot::{StackBuilder, StackOutcome};

const ORCHESTRATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::orchestrator");

/// Which route a build takes once its inputs are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// Stack group in this process, then the app group in a delegated
    /// process.
    StackThenDelegate,
    /// Stack group in this process; there is no app group to run.
    StackOnly,
    /// App group in this process after dropping to the build user.
    AppInPlace,
}

/// Chooses the execution path, refusing root when there are no stack
/// buildpacks to justify it.
///
/// A non-empty stack group always takes a stack path. Whether the process
/// can actually perform the stack build is for the stack build itself to
/// report.
///
/// ```
/// use strata_lifecycle::orchestrator::{ExecutionPath, select_path};
///
/// assert_eq!(select_path(true, false, false).ok(), Some(ExecutionPath::AppInPlace));
/// assert!(select_path(true, false, true).is_err());
/// ```
///
/// # Errors
///
/// Returns [`BuildFailure::PrivilegePolicyViolation`] when root is held
/// without stack buildpacks.
pub fn select_path(
    stack_empty: bool,
    app_empty: bool,
    privileged: bool,
) -> Result<ExecutionPath, BuildFailure> {
    match (stack_empty, privileged) {
        (true, true) => Err(BuildFailure::PrivilegePolicyViolation {
            reason: String::from(
                "the lifecycle runs as root but there are no stack buildpacks to justify it",
            ),
        }),
        (true, false) => Ok(ExecutionPath::AppInPlace),
        (false, _) if app_empty => Ok(ExecutionPath::StackOnly),
        (false, _) => Ok(ExecutionPath::StackThenDelegate),
    }
}

/// Documents read for one build, not yet checked.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    app: BuildpackGroup,
    stack: BuildpackGroup,
    plan: BuildPlan,
}

impl LoadedInputs {
    /// Reads the app group, the stack group when configured, and the plan.
    ///
    /// A missing group document is an empty group; a missing plan is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`BuildFailure::Infrastructure`] under [`Stage::ReadInputs`].
    pub fn load(config: &BuildConfig) -> Result<Self, BuildFailure> {
        let read_failure = |error: BuildpackError| BuildFailure::at(Stage::ReadInputs, error);
        let app = read_group_optional(config.group_path().as_std_path()).map_err(read_failure)?;
        let stack = match config.stack_group_path() {
            Some(path) => read_group_optional(path.as_std_path()).map_err(read_failure)?,
            None => BuildpackGroup::default(),
        };
        let plan = read_plan(config.plan_path().as_std_path()).map_err(read_failure)?;
        debug!(
            target: ORCHESTRATOR_TARGET,
            app = app.len(),
            stack = stack.len(),
            "build inputs loaded"
        );
        Ok(Self { app, stack, plan })
    }

    /// Gates the platform API and every buildpack's declared API.
    ///
    /// # Errors
    ///
    /// Returns [`BuildFailure::VersionIncompatible`] for the first declared
    /// version `support` does not cover.
    pub fn validate(
        self,
        config: &BuildConfig,
        support: &ApiSupport,
    ) -> Result<ValidatedInputs, BuildFailure> {
        let platform = config.platform_api();
        if !support.platform().is_superset_of(&platform) {
            return Err(BuildFailure::VersionIncompatible {
                subject: String::from("platform"),
                declared: platform,
                supported: support.platform(),
            });
        }
        for buildpack in self.stack.iter().chain(self.app.iter()) {
            if !support.buildpack().is_superset_of(&buildpack.api()) {
                return Err(BuildFailure::VersionIncompatible {
                    subject: format!("buildpack '{}'", buildpack.id()),
                    declared: buildpack.api(),
                    supported: support.buildpack(),
                });
            }
        }
        Ok(ValidatedInputs { inputs: self })
    }
}

/// Documents whose declared APIs this lifecycle serves.
#[derive(Debug, Clone)]
pub struct ValidatedInputs {
    inputs: LoadedInputs,
}

impl ValidatedInputs {
    /// App group.
    #[must_use]
    pub const fn app(&self) -> &BuildpackGroup {
        &self.inputs.app
    }

    /// Stack group.
    #[must_use]
    pub const fn stack(&self) -> &BuildpackGroup {
        &self.inputs.stack
    }

    /// Build plan.
    #[must_use]
    pub const fn plan(&self) -> &BuildPlan {
        &self.inputs.plan
    }
}

/// What a successful build did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Route the build took.
    pub path: ExecutionPath,
    /// Stack build result, when stack buildpacks ran.
    pub stack: Option<StackOutcome>,
    /// Metadata written by this process, for the in-place app path.
    pub metadata_path: Option<PathBuf>,
}

/// Drives one build invocation through its stages.
#[derive(Debug)]
pub struct Orchestrator<P, S, H, X> {
    privileges: P,
    stack_builder: S,
    handoff: H,
    executor: X,
    support: ApiSupport,
}

impl<P, S, H, X> Orchestrator<P, S, H, X>
where
    P: Privileges,
    S: StackBuilder,
    H: StageHandoff,
    X: BuildpackExecutor,
{
    /// Wires an orchestrator from its collaborators.
    #[must_use]
    pub fn new(privileges: P, stack_builder: S, handoff: H, executor: X) -> Self {
        Self {
            privileges,
            stack_builder,
            handoff,
            executor,
            support: ApiSupport::default(),
        }
    }

    /// Overrides the supported API versions.
    #[must_use]
    pub const fn with_api_support(mut self, support: ApiSupport) -> Self {
        self.support = support;
        self
    }

    /// Runs the build phase described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`BuildFailure`] of the first stage to fail.
    pub fn run(&mut self, config: &BuildConfig) -> Result<BuildOutcome, BuildFailure> {
        let inputs = LoadedInputs::load(config)?.validate(config, &self.support)?;
        let path = select_path(
            inputs.stack().is_empty(),
            inputs.app().is_empty(),
            self.privileges.is_privileged(),
        )?;
        info!(target: ORCHESTRATOR_TARGET, ?path, "execution path selected");

        match path {
            ExecutionPath::StackOnly => {
                let stack = self.build_stack(config, &inputs)?;
                Ok(BuildOutcome {
                    path,
                    stack: Some(stack),
                    metadata_path: None,
                })
            }
            ExecutionPath::StackThenDelegate => {
                let stack = self.build_stack(config, &inputs)?;
                self.handoff.hand_off(&HandoffRequest::from_config(config))?;
                Ok(BuildOutcome {
                    path,
                    stack: Some(stack),
                    metadata_path: None,
                })
            }
            ExecutionPath::AppInPlace => {
                let metadata_path = self.build_app(config, &inputs)?;
                Ok(BuildOutcome {
                    path,
                    stack: None,
                    metadata_path: Some(metadata_path),
                })
            }
        }
    }

    fn build_stack(
        &mut self,
        config: &BuildConfig,
        inputs: &ValidatedInputs,
    ) -> Result<StackOutcome, BuildFailure> {
        let context = build_context(config).with_env(env::vars_os().collect());
        self.stack_builder
            .stack_build(inputs.stack(), inputs.plan(), &context)
    }

    fn build_app(
        &mut self,
        config: &BuildConfig,
        inputs: &ValidatedInputs,
    ) -> Result<PathBuf, BuildFailure> {
        let credential = config.credential();
        let privilege_failure =
            |error: PrivilegeError| BuildFailure::infrastructure(Stage::Privileges, error);
        self.privileges
            .drop_to(credential)
            .map_err(privilege_failure)?;
        let overlay = self
            .privileges
            .environment_for(credential.uid())
            .map_err(privilege_failure)?;

        let context = build_context(config).with_env(overlay.apply(env::vars_os()));
        let metadata = GroupRunner::new(&self.executor)
            .run(inputs.app(), inputs.plan(), &context)
            .map_err(|error| BuildFailure::at(Stage::Build, error))?;
        write_metadata(config.layers_dir().as_std_path(), &metadata)
            .map_err(|error| BuildFailure::at(Stage::WriteMetadata, error))
    }
}

fn build_context(config: &BuildConfig) -> BuildContext {
    BuildContext::new(
        config.buildpacks_dir().as_std_path(),
        config.layers_dir().as_std_path(),
        config.app_dir().as_std_path(),
        config.platform_dir().as_std_path(),
        config.platform_api(),
    )
}

#[cfg(test)]
mod tests;
