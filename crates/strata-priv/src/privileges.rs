//! Probing and dropping the process identity.

use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nix::unistd::{Gid, Uid, User, geteuid, setgid, setuid};
use tracing::{debug, info};

use crate::credential::Credential;
use crate::env_overlay::EnvironmentOverlay;
use crate::error::PrivilegeError;

const PRIV_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::privileges");

/// `true` once the process has given up its original identity. Held for
/// the whole drop so concurrent callers cannot both attempt it.
static DROPPED: Mutex<bool> = Mutex::new(false);

/// Process-wide identity operations.
///
/// The lifecycle consults this seam instead of calling system functions
/// directly so the privilege policy can be exercised without root.
pub trait Privileges {
    /// Returns `true` when the process runs with an effective uid of root.
    fn is_privileged(&self) -> bool;

    /// Irreversibly switches the process to `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`PrivilegeError::Drop`] when a system call fails and
    /// [`PrivilegeError::AlreadyDropped`] once an earlier call succeeded. A
    /// failed drop leaves the process free to try again.
    fn drop_to(&mut self, credential: Credential) -> Result<(), PrivilegeError>;

    /// Reconstructs the user-scoped environment for `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`PrivilegeError::UnknownUser`] when no user has the id, or
    /// [`PrivilegeError::UserLookup`] when the lookup itself fails.
    fn environment_for(&self, uid: u32) -> Result<EnvironmentOverlay, PrivilegeError>;
}

/// [`Privileges`] backed by the host's system calls.
#[derive(Debug, Default)]
pub struct SystemPrivileges;

impl SystemPrivileges {
    /// Creates the system-backed implementation.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Privileges for SystemPrivileges {
    fn is_privileged(&self) -> bool {
        geteuid().is_root()
    }

    fn drop_to(&mut self, credential: Credential) -> Result<(), PrivilegeError> {
        let privileged = self.is_privileged();
        drop_once(&DROPPED, || switch_identity(credential, privileged))?;
        info!(
            target: PRIV_TARGET,
            uid = credential.uid(),
            gid = credential.gid(),
            "dropped privileges"
        );
        Ok(())
    }

    fn environment_for(&self, uid: u32) -> Result<EnvironmentOverlay, PrivilegeError> {
        let user = User::from_uid(Uid::from_raw(uid))
            .map_err(|source| PrivilegeError::UserLookup { uid, source })?
            .ok_or(PrivilegeError::UnknownUser { uid })?;
        debug!(
            target: PRIV_TARGET,
            uid,
            user = %user.name,
            home = %user.dir.display(),
            "resolved user environment"
        );
        Ok(EnvironmentOverlay::for_user(&user.name, &user.dir))
    }
}

/// Runs `switch` unless `state` records an earlier successful drop, and
/// records success only once `switch` returns `Ok`.
pub(crate) fn drop_once<F>(state: &Mutex<bool>, switch: F) -> Result<(), PrivilegeError>
where
    F: FnOnce() -> Result<(), PrivilegeError>,
{
    let mut dropped = state.lock().unwrap_or_else(PoisonError::into_inner);
    if *dropped {
        return Err(PrivilegeError::AlreadyDropped);
    }
    switch()?;
    *dropped = true;
    Ok(())
}

fn switch_identity(credential: Credential, privileged: bool) -> Result<(), PrivilegeError> {
    let gid = Gid::from_raw(credential.gid());
    let uid = Uid::from_raw(credential.uid());

    // Supplementary groups go first: only root may change them.
    if privileged {
        set_supplementary_groups(gid).map_err(drop_error(credential, "setgroups"))?;
    }
    // The gid has to change while the uid still permits it.
    setgid(gid).map_err(drop_error(credential, "setgid"))?;
    setuid(uid).map_err(drop_error(credential, "setuid"))
}

fn drop_error(credential: Credential, call: &'static str) -> impl FnOnce(Errno) -> PrivilegeError {
    move |source| PrivilegeError::Drop {
        credential,
        call,
        source,
    }
}

#[cfg(target_os = "linux")]
fn set_supplementary_groups(gid: Gid) -> Result<(), Errno> {
    nix::unistd::setgroups(&[gid])
}

#[cfg(not(target_os = "linux"))]
fn set_supplementary_groups(_gid: Gid) -> Result<(), Errno> {
    Ok(())
}
