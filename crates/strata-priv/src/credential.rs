//! The fixed unprivileged identity buildpacks run as.

use std::fmt;

/// A `uid:gid` pair supplied by the platform.
///
/// # Example
///
/// ```
/// use strata_priv::Credential;
///
/// let credential = Credential::new(1000, 1001);
/// assert_eq!(credential.to_string(), "1000:1001");
/// assert!(!credential.is_root());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Credential {
    uid: u32,
    gid: u32,
}

impl Credential {
    /// Creates a credential.
    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// User id.
    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    /// Group id.
    #[must_use]
    pub const fn gid(&self) -> u32 {
        self.gid
    }

    /// Returns `true` when either id is the superuser's.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.uid == 0 || self.gid == 0
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}
