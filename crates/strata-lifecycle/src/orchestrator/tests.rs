//! Unit tests for path selection and the orchestrator state machine.

use std::fs;
use std::io;
use std::path::Path;

use nix::errno::Errno;
use rstest::{fixture, rstest};
use strata_api::Version;
use strata_buildpacks::{BuildpackRef, BuildpackReport, Process};
use strata_priv::{Credential, EnvironmentOverlay};
use tempfile::TempDir;

use super::*;
use crate::failure::ExitStatus;
use crate::tests::{MockExecutor, MockHandoff, MockIdentity, MockStack, write_group};

type TestOrchestrator = Orchestrator<MockIdentity, MockStack, MockHandoff, MockExecutor>;

struct Workspace {
    layers: TempDir,
}

impl Workspace {
    fn path(&self) -> &Path {
        self.layers.path()
    }

    fn with_app(self, ids: &[&str]) -> Self {
        write_group(&self.path().join("group.toml"), ids);
        self
    }

    fn with_stack(self, ids: &[&str]) -> Self {
        write_group(&self.path().join("stack-group.toml"), ids);
        self
    }

    fn config(&self) -> BuildConfig {
        let layers = self.path().to_str().expect("utf-8 temp path");
        BuildConfig::load_from_iter([
            "strata-build",
            "--uid",
            "1000",
            "--gid",
            "1001",
            "--layers",
            layers,
        ])
        .expect("valid configuration")
    }
}

#[fixture]
fn workspace() -> Workspace {
    let layers = TempDir::new().expect("layers dir");
    fs::write(layers.path().join("plan.toml"), "").expect("write plan");
    Workspace { layers }
}

struct Doubles {
    identity: MockIdentity,
    stack: MockStack,
    handoff: MockHandoff,
    executor: MockExecutor,
}

impl Doubles {
    fn privileged(privileged: bool) -> Self {
        let mut identity = MockIdentity::new();
        identity.expect_is_privileged().return_const(privileged);
        Self {
            identity,
            stack: MockStack::new(),
            handoff: MockHandoff::new(),
            executor: MockExecutor::new(),
        }
    }

    fn orchestrator(self) -> TestOrchestrator {
        Orchestrator::new(self.identity, self.stack, self.handoff, self.executor)
    }

    fn forbid_app_build(&mut self) {
        self.identity.expect_drop_to().never();
        self.executor.expect_build().never();
    }

    fn forbid_stack_build(&mut self) {
        self.stack.expect_stack_build().never();
        self.handoff.expect_hand_off().never();
    }
}

fn stack_outcome(layers: &Path) -> StackOutcome {
    StackOutcome {
        buildpacks: vec![BuildpackRef {
            id: String::from("acme/apt"),
            version: String::from("1.0"),
        }],
        snapshot: layers.join("stack/snapshot.tar"),
    }
}

fn builder_overlay() -> EnvironmentOverlay {
    EnvironmentOverlay::for_user("builder", "/home/builder")
}

#[rstest]
#[case::app_only(true, false, false, Some(ExecutionPath::AppInPlace))]
#[case::nothing_at_all(true, true, false, Some(ExecutionPath::AppInPlace))]
#[case::stack_and_app(false, false, true, Some(ExecutionPath::StackThenDelegate))]
#[case::stack_only(false, true, true, Some(ExecutionPath::StackOnly))]
#[case::stack_without_root(false, false, false, Some(ExecutionPath::StackThenDelegate))]
#[case::stack_only_without_root(false, true, false, Some(ExecutionPath::StackOnly))]
#[case::root_without_stack(true, false, true, None)]
fn path_selection(
    #[case] stack_empty: bool,
    #[case] app_empty: bool,
    #[case] privileged: bool,
    #[case] expected: Option<ExecutionPath>,
) {
    let selected = select_path(stack_empty, app_empty, privileged);
    match expected {
        Some(path) => assert_eq!(selected.ok(), Some(path)),
        None => assert!(matches!(
            selected,
            Err(BuildFailure::PrivilegePolicyViolation { .. })
        )),
    }
}

#[rstest]
fn root_without_stack_runs_nothing(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node"]);
    let mut doubles = Doubles::privileged(true);
    doubles.forbid_app_build();
    doubles.forbid_stack_build();

    let failure = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect_err("policy violation");

    assert!(matches!(failure, BuildFailure::PrivilegePolicyViolation { .. }));
    assert_eq!(failure.exit_status(), ExitStatus::InvalidArguments);
}

#[rstest]
fn stack_without_root_reports_stack_build_failure(workspace: Workspace) {
    let workspace = workspace.with_stack(&["acme/apt"]).with_app(&["acme/node"]);
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_app_build();
    doubles.handoff.expect_hand_off().never();
    doubles.stack.expect_stack_build().once().returning(|_, _, _| {
        Err(BuildFailure::infrastructure(
            Stage::StackBuild,
            io::Error::from(io::ErrorKind::PermissionDenied),
        ))
    });

    let failure = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect_err("stack build fails without root");

    assert!(matches!(
        failure,
        BuildFailure::Infrastructure { stage: Stage::StackBuild, .. }
    ));
    assert_eq!(failure.exit_status(), ExitStatus::BuildError);
}

#[rstest]
fn stack_failure_stops_before_app_group(workspace: Workspace) {
    let workspace = workspace.with_stack(&["acme/apt"]).with_app(&["acme/node"]);
    let mut doubles = Doubles::privileged(true);
    doubles.forbid_app_build();
    doubles.handoff.expect_hand_off().never();
    doubles.stack.expect_stack_build().once().returning(|_, _, _| {
        Err(BuildFailure::at(
            Stage::StackBuild,
            BuildpackError::Failed {
                id: String::from("acme/apt"),
                status: Some(1),
            },
        ))
    });

    let failure = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect_err("stack fails");
    assert!(matches!(
        failure,
        BuildFailure::Buildpack { stage: Stage::StackBuild, .. }
    ));
}

#[rstest]
fn stack_and_app_delegate_exactly_once(workspace: Workspace) {
    let workspace = workspace.with_stack(&["acme/apt"]).with_app(&["acme/node"]);
    let layers = workspace.path().to_path_buf();
    let mut doubles = Doubles::privileged(true);
    doubles.forbid_app_build();
    doubles
        .stack
        .expect_stack_build()
        .once()
        .withf(|group, _, _| group.len() == 1)
        .returning(move |_, _, _| Ok(stack_outcome(&layers)));
    doubles
        .handoff
        .expect_hand_off()
        .once()
        .withf(|request| {
            request.credential == Credential::new(1000, 1001)
                && request.args.group_path.ends_with("group.toml")
        })
        .returning(|_| Ok(()));

    let outcome = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect("build succeeds");

    assert_eq!(outcome.path, ExecutionPath::StackThenDelegate);
    assert_eq!(outcome.metadata_path, None);
    assert!(outcome.stack.is_some());
}

#[rstest]
fn stack_only_skips_handoff(workspace: Workspace) {
    let workspace = workspace.with_stack(&["acme/apt"]);
    let layers = workspace.path().to_path_buf();
    let mut doubles = Doubles::privileged(true);
    doubles.forbid_app_build();
    doubles.handoff.expect_hand_off().never();
    doubles
        .stack
        .expect_stack_build()
        .once()
        .returning(move |_, _, _| Ok(stack_outcome(&layers)));

    let outcome = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect("build succeeds");
    assert_eq!(outcome.path, ExecutionPath::StackOnly);
    assert!(!workspace.path().join("config/metadata.toml").exists());
}

#[rstest]
fn app_only_drops_in_place_and_writes_metadata(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node", "acme/npm"]);
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_stack_build();
    doubles
        .identity
        .expect_drop_to()
        .once()
        .withf(|credential| *credential == Credential::new(1000, 1001))
        .returning(|_| Ok(()));
    doubles
        .identity
        .expect_environment_for()
        .once()
        .withf(|uid| *uid == 1000)
        .returning(|_| Ok(builder_overlay()));
    doubles
        .executor
        .expect_build()
        .times(2)
        .withf(|_, _, context| {
            context
                .env()
                .iter()
                .any(|(key, value)| key == "HOME" && value == "/home/builder")
        })
        .returning(|_, _, _| {
            Ok(BuildpackReport {
                processes: vec![Process {
                    kind: String::from("web"),
                    command: String::from("npm start"),
                    args: Vec::new(),
                    direct: false,
                }],
            })
        });

    let outcome = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect("build succeeds");

    let expected = workspace.path().join("config/metadata.toml");
    assert_eq!(outcome.path, ExecutionPath::AppInPlace);
    assert_eq!(outcome.metadata_path.as_deref(), Some(expected.as_path()));
    let written = fs::read_to_string(&expected).expect("metadata written");
    assert!(written.contains("acme/npm"), "{written}");
    assert!(written.contains("npm start"), "{written}");
}

fn app_doubles_with_ok_identity() -> Doubles {
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_stack_build();
    doubles.identity.expect_drop_to().returning(|_| Ok(()));
    doubles
        .identity
        .expect_environment_for()
        .returning(|_| Ok(builder_overlay()));
    doubles
}

#[rstest]
fn buildpack_and_write_failures_classify_differently(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node"]);

    let mut failing = app_doubles_with_ok_identity();
    failing.executor.expect_build().returning(|_, _, _| {
        Err(BuildpackError::Failed {
            id: String::from("acme/node"),
            status: Some(1),
        })
    });
    let buildpack_failure = failing
        .orchestrator()
        .run(&workspace.config())
        .expect_err("buildpack fails");

    fs::write(workspace.path().join("config"), "not a directory").expect("block config dir");
    let mut blocked = app_doubles_with_ok_identity();
    blocked
        .executor
        .expect_build()
        .returning(|_, _, _| Ok(BuildpackReport::default()));
    let write_failure = blocked
        .orchestrator()
        .run(&workspace.config())
        .expect_err("metadata write fails");

    assert!(matches!(
        buildpack_failure,
        BuildFailure::Buildpack { stage: Stage::Build, .. }
    ));
    assert!(matches!(
        write_failure,
        BuildFailure::Infrastructure { stage: Stage::WriteMetadata, .. }
    ));
    assert_eq!(buildpack_failure.exit_status().code(), 51);
    assert_eq!(write_failure.exit_status().code(), 52);
}

#[rstest]
fn failed_drop_runs_no_buildpacks(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node"]);
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_stack_build();
    doubles.executor.expect_build().never();
    doubles.identity.expect_environment_for().never();
    doubles.identity.expect_drop_to().returning(|credential| {
        Err(PrivilegeError::Drop {
            credential,
            call: "setuid",
            source: Errno::EPERM,
        })
    });

    let failure = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect_err("drop fails");
    assert!(matches!(
        failure,
        BuildFailure::Infrastructure { stage: Stage::Privileges, .. }
    ));
}

#[rstest]
fn incompatible_buildpack_api_runs_nothing(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node"]);
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_app_build();
    doubles.forbid_stack_build();

    let failure = doubles
        .orchestrator()
        .with_api_support(ApiSupport::new(Version::new(0, 1), strata_api::PLATFORM_API))
        .run(&workspace.config())
        .expect_err("api mismatch");

    match failure {
        BuildFailure::VersionIncompatible {
            subject, declared, ..
        } => {
            assert_eq!(subject, "buildpack 'acme/node'");
            assert_eq!(declared, Version::new(0, 2));
        }
        other => panic!("expected VersionIncompatible, got {other:?}"),
    }
}

#[rstest]
fn incompatible_platform_api_is_rejected(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node"]);
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_app_build();
    doubles.forbid_stack_build();

    let failure = doubles
        .orchestrator()
        .with_api_support(ApiSupport::new(strata_api::BUILDPACK_API, Version::new(0, 2)))
        .run(&workspace.config())
        .expect_err("platform mismatch");
    assert!(matches!(
        failure,
        BuildFailure::VersionIncompatible { ref subject, .. } if subject == "platform"
    ));
    assert_eq!(failure.stage(), Some(Stage::VerifyApis));
}

#[rstest]
fn missing_plan_is_fatal(workspace: Workspace) {
    let workspace = workspace.with_app(&["acme/node"]);
    fs::remove_file(workspace.path().join("plan.toml")).expect("remove plan");
    let mut doubles = Doubles::privileged(false);
    doubles.forbid_app_build();
    doubles.forbid_stack_build();

    let failure = doubles
        .orchestrator()
        .run(&workspace.config())
        .expect_err("plan missing");
    assert!(matches!(
        failure,
        BuildFailure::Infrastructure { stage: Stage::ReadInputs, .. }
    ));
}
