//! Configuration errors.

use thiserror::Error;

use strata_priv::Credential;

/// Errors raised while assembling the build configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The command line or environment could not be parsed.
    #[error(transparent)]
    Cli(#[from] clap::Error),
    /// The configured build identity is root or the root group.
    #[error("build identity {credential} must not be root")]
    RootCredential {
        /// Rejected identity.
        credential: Credential,
    },
}

impl ConfigError {
    /// Returns `true` when the error asks for help or version output rather
    /// than reporting a fault.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::Cli(error) if matches!(
                error.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            )
        )
    }
}
