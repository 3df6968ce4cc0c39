//! Default values for every configurable setting.

/// Directory holding installed buildpacks.
pub const DEFAULT_BUILDPACKS_DIR: &str = "/cnb/buildpacks";

/// Directory receiving layers and the detection documents.
pub const DEFAULT_LAYERS_DIR: &str = "/layers";

/// Application source directory.
pub const DEFAULT_APP_DIR: &str = "/workspace";

/// Platform-provided directory passed to every buildpack.
pub const DEFAULT_PLATFORM_DIR: &str = "/platform";

/// App group file name, resolved under the layers directory.
pub const GROUP_FILE: &str = "group.toml";

/// Stack group file name, resolved under the layers directory.
pub const STACK_GROUP_FILE: &str = "stack-group.toml";

/// Build plan file name, resolved under the layers directory.
pub const PLAN_FILE: &str = "plan.toml";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default platform API, the one this lifecycle implements.
#[must_use]
pub const fn default_platform_api() -> strata_api::Version {
    strata_api::PLATFORM_API
}
