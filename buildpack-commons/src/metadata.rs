//! Builder metadata shared between the buildpacks of a build.
//!
//! Every buildpack that contributes metadata loads the current file, adds its own keys and saves
//! it again. Later buildpacks therefore see (and may overwrite) what earlier ones recorded.

use crate::error::ErrorKind;
use crate::persist;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Environment variable that overrides where builder metadata is stored.
pub const METADATA_PATH_ENV_VAR: &str = "BUILDER_METADATA_PATH";

const DEFAULT_FILE_NAME: &str = "builder-metadata.toml";

/// Location of the builder metadata file.
///
/// Without an explicit location, the file lives next to the buildpack's own layers directory so
/// that all buildpacks of a build share it.
#[must_use]
pub fn metadata_path(configured: Option<PathBuf>, layers_dir: &Path) -> PathBuf {
    configured.unwrap_or_else(|| {
        layers_dir
            .parent()
            .unwrap_or(layers_dir)
            .join(DEFAULT_FILE_NAME)
    })
}

/// Keys known to the builder.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MetadataKey {
    Runtime,
    RuntimeVersion,
    FrameworkName,
    FrameworkVersion,
    AdapterName,
    AdapterVersion,
    BundlerVersion,
}

impl MetadataKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKey::Runtime => "runtime",
            MetadataKey::RuntimeVersion => "runtime_version",
            MetadataKey::FrameworkName => "framework_name",
            MetadataKey::FrameworkVersion => "framework_version",
            MetadataKey::AdapterName => "adapter_name",
            MetadataKey::AdapterVersion => "adapter_version",
            MetadataKey::BundlerVersion => "bundler_version",
        }
    }
}

impl Display for MetadataKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered key/value collection, persisted as a flat TOML table.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuilderMetadata {
    entries: BTreeMap<String, String>,
}

impl BuilderMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: MetadataKey, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.as_str().to_string(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.entries.get(key.as_str()).map(String::as_str)
    }

    /// Adds all entries of `other`, replacing the values of keys present in both.
    pub fn merge(&mut self, other: BuilderMetadata) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads metadata from the given file. A file that doesn't exist yet is empty metadata.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(contents) => toml::from_str(&contents).map_err(MetadataError::TomlDeserialization),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(MetadataError::Io(error)),
        }
    }

    /// Writes the metadata to the given file, replacing it in one step.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MetadataError> {
        let contents = toml::to_string(self).map_err(MetadataError::TomlSerialization)?;
        persist::write_atomically(path.as_ref(), contents).map_err(MetadataError::Io)
    }

    /// Loads the file, merges these entries into it and saves the result.
    pub fn merge_into_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<BuilderMetadata, MetadataError> {
        let path = path.as_ref();
        let mut existing = Self::load(path)?;
        existing.merge(self.clone());
        existing.save(path)?;
        Ok(existing)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("I/O error while reading/writing builder metadata: {0}")]
    Io(io::Error),

    #[error("Builder metadata isn't valid TOML: {0}")]
    TomlDeserialization(toml::de::Error),

    #[error("Builder metadata couldn't be serialized: {0}")]
    TomlSerialization(toml::ser::Error),
}

impl MetadataError {
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}
