//! Process identity management for the Strata build lifecycle.
//!
//! App buildpacks must never run as root. This crate provides the pieces the
//! lifecycle uses to enforce that:
//!
//! - [`Credential`] names the fixed unprivileged `uid:gid` pair supplied by
//!   the platform.
//! - [`Privileges`] abstracts the process-wide identity: probing whether the
//!   process is elevated, irreversibly dropping to a credential, and looking
//!   up the target user's environment.
//! - [`EnvironmentOverlay`] carries the user-scoped variables (`HOME`,
//!   `USER`, `LOGNAME`) that replace the root values before buildpacks run.
//!
//! [`SystemPrivileges`] is the production implementation backed by `nix`.
//! The drop succeeds at most once per process; later calls return
//! [`PrivilegeError::AlreadyDropped`]. A failed drop may be retried.
//!
//! ```rust,no_run
//! use strata_priv::{Credential, Privileges, SystemPrivileges};
//!
//! # fn main() -> Result<(), strata_priv::PrivilegeError> {
//! let mut privileges = SystemPrivileges::new();
//! let credential = Credential::new(1000, 1000);
//! privileges.drop_to(credential)?;
//! let overlay = privileges.environment_for(credential.uid())?;
//! let env = overlay.apply(std::env::vars_os());
//! # let _ = env;
//! # Ok(()) }
//! ```

mod credential;
mod env_overlay;
mod error;
mod privileges;

#[cfg(test)]
mod tests;

pub use credential::Credential;
pub use env_overlay::EnvironmentOverlay;
pub use error::PrivilegeError;
pub use privileges::{Privileges, SystemPrivileges};
