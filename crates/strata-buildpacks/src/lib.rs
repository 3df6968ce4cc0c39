//! Buildpack documents and execution for the Strata build lifecycle.
//!
//! The `strata-buildpacks` crate owns everything the lifecycle needs to know
//! about buildpacks themselves: the group and plan documents detection
//! produces, the metadata the build leaves for export, and the seam through
//! which individual buildpacks are executed.
//!
//! # Architecture
//!
//! A [`GroupRunner`] walks a [`BuildpackGroup`] and delegates each buildpack
//! to a [`BuildpackExecutor`]. The production executor,
//! [`ProcessExecutor`](process::ProcessExecutor), runs the buildpack's
//! `bin/build` as a child process. Every [`BuildpackError`] carries a fixed
//! [`FaultOrigin`], which lets callers tell a buildpack's own failure apart
//! from a failure of the machinery around it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use strata_api::Version;
//! use strata_buildpacks::documents::{read_group_optional, read_plan, write_metadata};
//! use strata_buildpacks::process::ProcessExecutor;
//! use strata_buildpacks::{BuildContext, GroupRunner};
//!
//! # fn main() -> Result<(), strata_buildpacks::BuildpackError> {
//! let group = read_group_optional(Path::new("/layers/group.toml"))?;
//! let plan = read_plan(Path::new("/layers/plan.toml"))?;
//! let context = BuildContext::new(
//!     "/cnb/buildpacks", "/layers", "/workspace", "/platform", Version::new(0, 3),
//! );
//! let metadata = GroupRunner::new(ProcessExecutor).run(&group, &plan, &context)?;
//! write_metadata(Path::new("/layers"), &metadata)?;
//! # Ok(()) }
//! ```

pub mod descriptor;
pub mod documents;
pub mod error;
pub mod metadata;
pub mod plan;
pub mod process;
pub mod runner;

#[cfg(test)]
mod tests;

pub use self::descriptor::{BuildpackDescriptor, BuildpackGroup};
pub use self::error::{BuildpackError, FaultOrigin};
pub use self::metadata::{BuildMetadata, BuildpackRef, LaunchDocument, Process};
pub use self::plan::BuildPlan;
pub use self::runner::{BuildContext, BuildpackExecutor, BuildpackReport, GroupRunner};
