//! The build plan produced by detection.

use serde::{Deserialize, Serialize};

use crate::error::BuildpackError;

/// Dependency plan resolved during detection.
///
/// The lifecycle never interprets the plan. It is parsed only to reject a
/// malformed document early, then handed to each buildpack verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildPlan(toml::Table);

impl BuildPlan {
    /// Wraps an already-parsed plan table.
    #[must_use]
    pub const fn new(table: toml::Table) -> Self {
        Self(table)
    }

    /// Returns the underlying table.
    #[must_use]
    pub const fn as_table(&self) -> &toml::Table {
        &self.0
    }

    /// Renders the plan as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`BuildpackError::Serialize`] when the table cannot be encoded.
    pub fn to_toml_string(&self) -> Result<String, BuildpackError> {
        toml::to_string(&self.0).map_err(|source| BuildpackError::Serialize {
            document: "build plan",
            source,
        })
    }
}
