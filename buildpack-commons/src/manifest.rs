//! Appending compatibility entries to dependency manifests.
//!
//! Newer runtime versions sometimes stop shipping libraries that applications relied on
//! implicitly. A [`CompatibilityPatch`] declares such a set of libraries together with the runtime
//! version that removed them, and appends the ones a manifest doesn't declare yet.

use crate::error::ErrorKind;
use crate::persist;
use crate::version::SemanticVersion;
use std::fs;
use std::io;
use std::path::Path;

/// A set of manifest entries required for runtime versions at or above `threshold`.
#[derive(Debug, Clone)]
pub struct CompatibilityPatch<'a> {
    pub threshold: SemanticVersion,
    /// Comment line written once in front of the appended entries.
    pub marker: &'a str,
    /// Manifest directive used to declare an entry, e.g. `gem`.
    pub directive: &'a str,
    /// Entry names, appended in this order.
    pub entries: &'a [&'a str],
}

impl<'a> CompatibilityPatch<'a> {
    #[must_use]
    pub fn applies_to(&self, runtime_version: &SemanticVersion) -> bool {
        runtime_version >= &self.threshold
    }

    /// Whether any line already references the entry, either single or double quoted.
    ///
    /// This is a plain substring check, not a manifest parser. Entries declared in other styles,
    /// e.g. with extra whitespace or parentheses, are not recognized.
    #[must_use]
    pub fn is_declared<S: AsRef<str>>(&self, entry: &str, lines: &[S]) -> bool {
        let single_quoted = format!("{} '{entry}'", self.directive);
        let double_quoted = format!("{} \"{entry}\"", self.directive);

        lines.iter().any(|line| {
            let line = line.as_ref();
            line.contains(&single_quoted) || line.contains(&double_quoted)
        })
    }

    /// The entries not yet declared in the given lines, in declaration order of the patch.
    #[must_use]
    pub fn missing_entries<S: AsRef<str>>(&self, lines: &[S]) -> Vec<&'a str> {
        self.entries
            .iter()
            .copied()
            .filter(|entry| !self.is_declared(entry, lines))
            .collect()
    }

    /// The complete new manifest contents, or `None` if nothing has to be appended.
    #[must_use]
    pub fn apply(&self, runtime_version: &SemanticVersion, contents: &str) -> Option<Patched<'a>> {
        if !self.applies_to(runtime_version) {
            return None;
        }

        let lines = contents.lines().collect::<Vec<_>>();
        let added = self.missing_entries(&lines);

        if added.is_empty() {
            return None;
        }

        let mut patched = String::from(contents);
        patched.push('\n');
        patched.push_str(self.marker);
        patched.push('\n');
        for entry in &added {
            patched.push_str(&format!("{} '{entry}'\n", self.directive));
        }

        Some(Patched {
            contents: patched,
            added,
        })
    }

    /// Patches the manifest at the given path in place and returns the names of the added
    /// entries.
    ///
    /// The new contents are written to a temporary file next to the manifest which then replaces
    /// it, so a failed write never leaves a partially patched manifest behind.
    pub fn apply_to_file(
        &self,
        runtime_version: &SemanticVersion,
        path: impl AsRef<Path>,
    ) -> Result<Vec<&'a str>, PatchError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(PatchError::ReadManifest)?;

        let Some(patched) = self.apply(runtime_version, &contents) else {
            return Ok(Vec::new());
        };

        persist::write_atomically(path, patched.contents).map_err(PatchError::WriteManifest)?;

        Ok(patched.added)
    }
}

/// Result of [`CompatibilityPatch::apply`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Patched<'a> {
    pub contents: String,
    pub added: Vec<&'a str>,
}

#[derive(thiserror::Error, Debug)]
pub enum PatchError {
    #[error("Couldn't read manifest: {0}")]
    ReadManifest(io::Error),

    #[error("Couldn't write manifest: {0}")]
    WriteManifest(io::Error),
}

impl PatchError {
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}
