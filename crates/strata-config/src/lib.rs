//! Configuration for the Strata build lifecycle.
//!
//! Both binaries read the same flags, each with an environment fallback named
//! after the platform convention (`CNB_LAYERS_DIR`, `CNB_USER_ID`, ...).
//! Document paths left unset resolve beneath the layers directory. The
//! resolved [`BuildConfig`] is immutable for the rest of the invocation.

mod cli;
mod config;
pub mod defaults;
mod error;
mod logging;

#[cfg(test)]
mod tests;

pub use cli::{AppBuildArgs, BuildArgs, StageArgs};
pub use config::BuildConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError, LoggingConfig};
