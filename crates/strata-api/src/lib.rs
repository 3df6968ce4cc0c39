//! API version model for the Strata build lifecycle.
//!
//! Buildpacks declare the buildpack API they were written against and the
//! platform declares the platform API it speaks. Both are `major.minor`
//! [`Version`] values. Before any buildpack runs, the lifecycle checks each
//! declaration with [`Version::is_superset_of`] against the API it
//! implements, captured in [`ApiSupport`].
//!
//! ```
//! use strata_api::{ApiSupport, Version};
//!
//! let support = ApiSupport::default();
//! assert!(support.buildpack().is_superset_of(&support.buildpack()));
//! assert!(!Version::new(2, 0).is_superset_of(&Version::new(1, 0)));
//! ```

mod version;

#[cfg(test)]
mod tests;

pub use version::{Version, VersionParseError};

/// Buildpack API implemented by this lifecycle.
pub const BUILDPACK_API: Version = Version::new(0, 2);

/// Platform API implemented by this lifecycle.
pub const PLATFORM_API: Version = Version::new(0, 3);

/// The API versions a lifecycle build can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiSupport {
    buildpack: Version,
    platform: Version,
}

impl ApiSupport {
    /// Creates a support pair from explicit versions.
    #[must_use]
    pub const fn new(buildpack: Version, platform: Version) -> Self {
        Self {
            buildpack,
            platform,
        }
    }

    /// Buildpack API this lifecycle implements.
    #[must_use]
    pub const fn buildpack(&self) -> Version {
        self.buildpack
    }

    /// Platform API this lifecycle implements.
    #[must_use]
    pub const fn platform(&self) -> Version {
        self.platform
    }
}

impl Default for ApiSupport {
    fn default() -> Self {
        Self::new(BUILDPACK_API, PLATFORM_API)
    }
}
