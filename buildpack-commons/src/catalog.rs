use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// A single release in a version catalog.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub version: String,
    pub stable: bool,
}

impl CatalogEntry {
    pub fn new(version: impl Into<String>, stable: bool) -> Self {
        Self {
            version: version.into(),
            stable,
        }
    }
}

/// The releases of a runtime, in the order the catalog source returned them.
///
/// The order is not assumed to be sorted. Catalogs are usually published as a JSON array of
/// `{"version": "...", "stable": true}` objects, additional fields are ignored.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json)
            .map(Self::new)
            .map_err(CatalogError::Json)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        serde_json::from_reader(reader)
            .map(Self::new)
            .map_err(CatalogError::Json)
    }

    /// Fetches the catalog with a single GET request. There is no retry, callers that need one
    /// have to wrap this call.
    #[cfg(feature = "http")]
    pub fn fetch(url: impl AsRef<str>) -> Result<Self, CatalogError> {
        let response = ureq::get(url.as_ref()).call().map_err(Box::new)?;
        Self::from_reader(response.into_reader())
    }

    /// Removes a prefix from every entry version, e.g. `go` from `go1.16`.
    #[must_use]
    pub fn strip_version_prefix(self, prefix: &str) -> Self {
        Self::new(
            self.entries
                .into_iter()
                .map(|entry| CatalogEntry {
                    version: match entry.version.strip_prefix(prefix) {
                        Some(stripped) => stripped.to_string(),
                        None => entry.version,
                    },
                    stable: entry.stable,
                })
                .collect(),
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    // Boxed to prevent `large_enum_variant` errors since `ureq::Error` is massive.
    #[cfg(feature = "http")]
    #[error("HTTP error while fetching the version catalog: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("Couldn't parse the version catalog: {0}")]
    Json(serde_json::Error),
}

impl CatalogError {
    /// A catalog that can't be fetched or parsed is a problem of the build environment, never of
    /// the application.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}
