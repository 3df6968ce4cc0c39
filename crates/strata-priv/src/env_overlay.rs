//! User-scoped environment variables that replace the launching identity's.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::Path;

/// Variables whose values depend on the identity a process runs as.
pub(crate) const USER_SCOPED_KEYS: [&str; 3] = ["HOME", "USER", "LOGNAME"];

/// Environment values reconstructed for the unprivileged user.
///
/// The overlay is computed after the privilege drop so no value derived from
/// the root identity survives into buildpack processes.
///
/// # Example
///
/// ```
/// use std::ffi::OsString;
/// use strata_priv::EnvironmentOverlay;
///
/// let overlay = EnvironmentOverlay::for_user("cnb", "/home/cnb");
/// let env = overlay.apply([
///     (OsString::from("HOME"), OsString::from("/root")),
///     (OsString::from("PATH"), OsString::from("/usr/bin")),
/// ]);
/// assert!(env.contains(&(OsString::from("HOME"), OsString::from("/home/cnb"))));
/// assert!(env.contains(&(OsString::from("PATH"), OsString::from("/usr/bin"))));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverlay {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvironmentOverlay {
    /// Builds the overlay for a user name and home directory.
    #[must_use]
    pub fn for_user(name: &str, home: impl AsRef<Path>) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(
            OsString::from("HOME"),
            home.as_ref().as_os_str().to_os_string(),
        );
        vars.insert(OsString::from("USER"), OsString::from(name));
        vars.insert(OsString::from("LOGNAME"), OsString::from(name));
        Self { vars }
    }

    /// Returns the value the overlay assigns to `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OsString> {
        self.vars.get(&OsString::from(key))
    }

    /// Iterates over the overlay's variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.vars.iter()
    }

    /// Merges the overlay onto a base environment.
    ///
    /// User-scoped keys from the base are discarded even when the overlay
    /// does not set them; overlay values win; all other base variables are
    /// kept in their original order.
    pub fn apply<I>(&self, base: I) -> Vec<(OsString, OsString)>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let scoped: HashSet<OsString> = USER_SCOPED_KEYS.iter().map(OsString::from).collect();
        let mut merged: Vec<(OsString, OsString)> = base
            .into_iter()
            .filter(|(key, _)| !scoped.contains(key) && !self.vars.contains_key(key))
            .collect();
        merged.extend(
            self.vars
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        merged
    }
}
