//! Reading lifecycle input documents and persisting build metadata.
//!
//! Group documents are optional: a path that does not exist yields an empty
//! [`BuildpackGroup`], while a document that exists but cannot be read or
//! parsed is an error. The plan has no such allowance; it must exist and
//! parse.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::descriptor::BuildpackGroup;
use crate::error::BuildpackError;
use crate::metadata::BuildMetadata;
use crate::plan::BuildPlan;

const DOCUMENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::documents");

/// Loads a group document, treating a missing file as an empty group.
///
/// # Errors
///
/// Returns [`BuildpackError::GroupRead`] when the file exists but cannot be
/// read and [`BuildpackError::GroupParse`] when it is malformed.
pub fn read_group_optional(path: &Path) -> Result<BuildpackGroup, BuildpackError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(
                target: DOCUMENTS_TARGET,
                path = %path.display(),
                "group document absent; using empty group"
            );
            return Ok(BuildpackGroup::default());
        }
        Err(source) => {
            return Err(BuildpackError::GroupRead {
                path: path.to_path_buf(),
                source: Arc::new(source),
            });
        }
    };
    toml::from_str(&text).map_err(|source| BuildpackError::GroupParse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Loads the build plan.
///
/// # Errors
///
/// Returns [`BuildpackError::PlanRead`] when the file is missing or
/// unreadable and [`BuildpackError::PlanParse`] when it is malformed.
pub fn read_plan(path: &Path) -> Result<BuildPlan, BuildpackError> {
    let text = fs::read_to_string(path).map_err(|source| BuildpackError::PlanRead {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    toml::from_str(&text).map_err(|source| BuildpackError::PlanParse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Location of the build metadata document under a layers directory.
#[must_use]
pub fn metadata_path(layers_dir: &Path) -> PathBuf {
    layers_dir.join("config").join("metadata.toml")
}

/// Writes build metadata to [`metadata_path`], creating `config/` as needed.
///
/// # Errors
///
/// Returns [`BuildpackError::Serialize`] when the metadata cannot be encoded
/// and [`BuildpackError::MetadataWrite`] when the document cannot be written.
pub fn write_metadata(
    layers_dir: &Path,
    metadata: &BuildMetadata,
) -> Result<PathBuf, BuildpackError> {
    let path = metadata_path(layers_dir);
    let document = toml::to_string(metadata).map_err(|source| BuildpackError::Serialize {
        document: "build metadata",
        source,
    })?;
    let write_error = |source| BuildpackError::MetadataWrite {
        path: path.clone(),
        source: Arc::new(source),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(write_error)?;
    file.write_all(document.as_bytes()).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;

    info!(
        target: DOCUMENTS_TARGET,
        file = %path.display(),
        buildpacks = metadata.buildpacks.len(),
        processes = metadata.processes.len(),
        "build metadata written"
    );
    Ok(path)
}
