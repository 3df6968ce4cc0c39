//! Command-line definitions for the two lifecycle binaries.
//!
//! Every flag falls back to an environment variable, so a platform can drive
//! the lifecycle purely through its container environment. Neither binary
//! accepts positional arguments.

use camino::Utf8PathBuf;
use clap::{Args, Parser};
use strata_api::Version;

use crate::defaults::{
    DEFAULT_APP_DIR, DEFAULT_BUILDPACKS_DIR, DEFAULT_LAYERS_DIR, DEFAULT_LOG_FILTER,
    DEFAULT_PLATFORM_DIR, default_platform_api,
};
use crate::logging::LogFormat;

/// Flags shared by the orchestrator and the app build stage.
#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    /// Directory holding installed buildpacks.
    #[arg(long = "buildpacks", env = "CNB_BUILDPACKS_DIR", value_name = "DIR", default_value = DEFAULT_BUILDPACKS_DIR)]
    pub buildpacks_dir: Utf8PathBuf,
    /// App group document; defaults to `<layers>/group.toml`.
    #[arg(long = "group", env = "CNB_GROUP_PATH", value_name = "PATH")]
    pub group_path: Option<Utf8PathBuf>,
    /// Build plan document; defaults to `<layers>/plan.toml`.
    #[arg(long = "plan", env = "CNB_PLAN_PATH", value_name = "PATH")]
    pub plan_path: Option<Utf8PathBuf>,
    /// Directory receiving buildpack layers.
    #[arg(long = "layers", env = "CNB_LAYERS_DIR", value_name = "DIR", default_value = DEFAULT_LAYERS_DIR)]
    pub layers_dir: Utf8PathBuf,
    /// Application source directory.
    #[arg(long = "app", env = "CNB_APP_DIR", value_name = "DIR", default_value = DEFAULT_APP_DIR)]
    pub app_dir: Utf8PathBuf,
    /// Platform directory passed to buildpacks.
    #[arg(long = "platform", env = "CNB_PLATFORM_DIR", value_name = "DIR", default_value = DEFAULT_PLATFORM_DIR)]
    pub platform_dir: Utf8PathBuf,
    /// Platform API the platform speaks.
    #[arg(long = "platform-api", env = "CNB_PLATFORM_API", value_name = "VERSION", default_value_t = default_platform_api())]
    pub platform_api: Version,
    /// User id app buildpacks run as.
    #[arg(long = "uid", env = "CNB_USER_ID", value_name = "UID")]
    pub uid: u32,
    /// Group id app buildpacks run as.
    #[arg(long = "gid", env = "CNB_GROUP_ID", value_name = "GID")]
    pub gid: u32,
    /// `tracing` filter directives.
    #[arg(long = "log-filter", env = "STRATA_LOG", value_name = "FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format (`compact` or `json`).
    #[arg(long = "log-format", env = "STRATA_LOG_FORMAT", value_name = "FORMAT", default_value_t = LogFormat::default())]
    pub log_format: LogFormat,
}

/// Arguments accepted by `strata-build`.
#[derive(Parser, Debug, Clone)]
#[command(name = "strata-build", version, about = "Runs the build phase of a buildpack lifecycle")]
pub struct BuildArgs {
    /// Flags shared with the app build stage.
    #[command(flatten)]
    pub stage: StageArgs,
    /// Stack group document; defaults to `<layers>/stack-group.toml`.
    #[arg(long = "stack-group", env = "CNB_STACK_GROUP_PATH", value_name = "PATH")]
    pub stack_group_path: Option<Utf8PathBuf>,
    /// Snapshot tool used to capture stack buildpack changes.
    #[arg(long = "snapshotter", env = "CNB_SNAPSHOTTER", value_name = "PATH")]
    pub snapshotter: Option<Utf8PathBuf>,
}

/// Arguments accepted by `strata-app-build`.
#[derive(Parser, Debug, Clone)]
#[command(name = "strata-app-build", version, about = "Runs app buildpacks as the build user")]
pub struct AppBuildArgs {
    /// Flags shared with the orchestrator.
    #[command(flatten)]
    pub stage: StageArgs,
}
