//! Buildpack descriptors and the ordered groups that detection resolves.
//!
//! A [`BuildpackGroup`] is the `[[group]]` array of a group document. The
//! lifecycle consumes two of them: the app group, run unprivileged, and the
//! stack group, run as root.

use serde::{Deserialize, Serialize};
use strata_api::Version;

/// Identity and declared API of a single buildpack.
///
/// # Example
///
/// ```
/// use strata_api::Version;
/// use strata_buildpacks::BuildpackDescriptor;
///
/// let descriptor = BuildpackDescriptor::new("acme/node", "1.2.0", Version::new(0, 2));
/// assert_eq!(descriptor.escaped_id(), "acme_node");
/// assert!(!descriptor.is_optional());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackDescriptor {
    id: String,
    version: String,
    api: Version,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
}

impl BuildpackDescriptor {
    /// Creates a required descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>, api: Version) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            api,
            optional: false,
        }
    }

    /// Marks the descriptor optional.
    #[must_use]
    pub const fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Returns the buildpack identifier.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the buildpack version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the buildpack API the buildpack was written against.
    #[must_use]
    pub const fn api(&self) -> Version {
        self.api
    }

    /// Returns whether detection marked the buildpack optional.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Identifier with `/` replaced so it can name a single path component.
    #[must_use]
    pub fn escaped_id(&self) -> String {
        self.id.replace('/', "_")
    }
}

/// Ordered buildpacks selected by detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackGroup {
    #[serde(default)]
    group: Vec<BuildpackDescriptor>,
}

impl BuildpackGroup {
    /// Creates a group from descriptors in execution order.
    #[must_use]
    pub const fn new(group: Vec<BuildpackDescriptor>) -> Self {
        Self { group }
    }

    /// Returns `true` when the group has no buildpacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// Number of buildpacks in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.group.len()
    }

    /// Iterates over the buildpacks in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, BuildpackDescriptor> {
        self.group.iter()
    }
}

impl<'a> IntoIterator for &'a BuildpackGroup {
    type Item = &'a BuildpackDescriptor;
    type IntoIter = std::slice::Iter<'a, BuildpackDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<BuildpackDescriptor> for BuildpackGroup {
    fn from_iter<I: IntoIterator<Item = BuildpackDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
