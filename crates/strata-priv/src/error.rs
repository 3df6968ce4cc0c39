//! Domain errors raised while changing process identity.

use nix::errno::Errno;
use thiserror::Error;

use crate::credential::Credential;

/// Errors raised while dropping privileges or resolving the user environment.
#[derive(Debug, Error)]
pub enum PrivilegeError {
    /// An identity-changing system call failed.
    #[error("failed to drop privileges to {credential} ({call}): {source}")]
    Drop {
        /// Credential that was requested.
        credential: Credential,
        /// System call that failed.
        call: &'static str,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },

    /// Privileges were already dropped earlier in this process.
    #[error("privileges were already dropped in this process")]
    AlreadyDropped,

    /// The password database could not be queried.
    #[error("failed to look up user {uid}: {source}")]
    UserLookup {
        /// User id that was queried.
        uid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },

    /// No password database entry exists for the user id.
    #[error("no user exists with uid {uid}")]
    UnknownUser {
        /// User id that was queried.
        uid: u32,
    },
}
