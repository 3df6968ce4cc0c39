//! Unit and behaviour tests for configuration loading.

use rstest::rstest;

use crate::{BuildConfig, ConfigError, LogFormat};


fn load(extra: &[&str]) -> Result<BuildConfig, ConfigError> {
    let mut args = vec!["strata-build", "--uid", "1000", "--gid", "1001"];
    args.extend_from_slice(extra);
    BuildConfig::load_from_iter(args)
}

#[rstest]
fn documents_default_beneath_layers() {
    let config = load(&["--layers", "/tmp/layers"]).expect("valid arguments");
    assert_eq!(config.group_path().as_str(), "/tmp/layers/group.toml");
    assert_eq!(config.plan_path().as_str(), "/tmp/layers/plan.toml");
    assert_eq!(
        config.stack_group_path().map(|path| path.as_str()),
        Some("/tmp/layers/stack-group.toml")
    );
}

#[rstest]
fn explicit_paths_win_over_layers_defaults() {
    let config = load(&[
        "--group",
        "/in/group.toml",
        "--stack-group",
        "/in/stack.toml",
        "--plan",
        "/in/plan.toml",
    ])
    .expect("valid arguments");
    assert_eq!(config.group_path().as_str(), "/in/group.toml");
    assert_eq!(
        config.stack_group_path().map(|path| path.as_str()),
        Some("/in/stack.toml")
    );
    assert_eq!(config.plan_path().as_str(), "/in/plan.toml");
}

#[rstest]
fn credential_comes_from_flags() {
    let config = load(&[]).expect("valid arguments");
    assert_eq!(config.credential().uid(), 1000);
    assert_eq!(config.credential().gid(), 1001);
}

#[rstest]
#[case::root_user("0", "1000")]
#[case::root_group("1000", "0")]
fn root_credential_is_rejected(#[case] uid: &str, #[case] gid: &str) {
    let error = BuildConfig::load_from_iter(["strata-build", "--uid", uid, "--gid", gid])
        .expect_err("root identity must fail");
    assert!(matches!(error, ConfigError::RootCredential { .. }));
    assert!(error.to_string().contains("must not be root"));
}

#[rstest]
fn positional_arguments_are_rejected() {
    let error = load(&["unexpected"]).expect_err("positional argument must fail");
    assert!(matches!(error, ConfigError::Cli(_)));
    assert!(!error.is_informational());
}

#[rstest]
fn help_is_informational() {
    let error = BuildConfig::load_from_iter(["strata-build", "--help"]).expect_err("help exits");
    assert!(error.is_informational());
}

#[rstest]
fn malformed_platform_api_is_rejected() {
    let error = load(&["--platform-api", "1.2.3"]).expect_err("malformed api must fail");
    assert!(matches!(error, ConfigError::Cli(_)));
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("JSON", LogFormat::Json)]
#[case("compact", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    let config = load(&["--log-format", text]).expect("valid arguments");
    assert_eq!(config.logging().format(), expected);
}

#[rstest]
fn logging_defaults_to_compact_info() {
    let config = load(&[]).expect("valid arguments");
    assert_eq!(config.logging().filter(), "info");
    assert_eq!(config.logging().format(), LogFormat::Compact);
}

#[rstest]
fn app_stage_has_no_stack_group_or_snapshotter() {
    let config =
        BuildConfig::load_app_stage_from_iter(["strata-app-build", "--uid", "1000", "--gid", "1000"])
            .expect("valid arguments");
    assert_eq!(config.stack_group_path(), None);
    assert_eq!(config.snapshotter(), None);
}

#[rstest]
fn app_stage_rejects_stack_flags() {
    let error = BuildConfig::load_app_stage_from_iter([
        "strata-app-build",
        "--uid",
        "1000",
        "--gid",
        "1000",
        "--stack-group",
        "/in/stack.toml",
    ])
    .expect_err("stack group is not an app stage flag");
    assert!(matches!(error, ConfigError::Cli(_)));
}
