use crate::error::VersionError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A semantic version as it appears in manifests, lock files and version catalogs.
///
/// Unlike strict semver, the minor and patch components are optional (`1`, `1.13`) and a
/// pre-release tag may follow the numeric part directly (`1.15rc1`, `1.21beta2`) or after a
/// dash (`1.0.0-alpha`).
///
/// Missing components compare as zero, so `1.13` and `1.13.0` are equal. The original text is
/// kept for display, so both still render the way they were written.
///
/// # Examples
/// ```
/// use buildpack_commons::SemanticVersion;
///
/// let short: SemanticVersion = "1.13".parse().unwrap();
/// let long: SemanticVersion = "1.13.0".parse().unwrap();
///
/// assert_eq!(short, long);
/// assert_eq!(short.to_string(), "1.13");
/// assert_eq!(long.to_string(), "1.13.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
    prerelease: Option<String>,
    original: String,
}

impl SemanticVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor: Some(minor),
            patch: Some(patch),
            prerelease: None,
            original: format!("{major}.{minor}.{patch}"),
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> Option<u64> {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> Option<u64> {
        self.patch
    }

    #[must_use]
    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Number of numeric components that were written out (1 to 3).
    #[must_use]
    pub fn component_count(&self) -> usize {
        1 + usize::from(self.minor.is_some()) + usize::from(self.patch.is_some())
    }

    /// The numeric part only, with as many components as were written out.
    #[must_use]
    pub fn numeric_string(&self) -> String {
        match (self.minor, self.patch) {
            (Some(minor), Some(patch)) => format!("{}.{minor}.{patch}", self.major),
            (Some(minor), None) => format!("{}.{minor}", self.major),
            _ => self.major.to_string(),
        }
    }

    /// Drops the pre-release tag, e.g. `1.15rc1` becomes `1.15`.
    #[must_use]
    pub fn without_prerelease(&self) -> Self {
        Self {
            prerelease: None,
            original: self.numeric_string(),
            ..self.clone()
        }
    }

    /// Renders the numeric part as `major.minor.patch`, filling in zeros.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        let (major, minor, patch) = self.numeric_key();
        format!("{major}.{minor}.{patch}")
    }

    fn numeric_key(&self) -> (u64, u64, u64) {
        (
            self.major,
            self.minor.unwrap_or_default(),
            self.patch.unwrap_or_default(),
        )
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::MalformedVersion(input.to_string());

        let trimmed = input.trim();
        let unprefixed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        // Build metadata is accepted but doesn't take part in comparisons.
        let without_build = match unprefixed.split_once('+') {
            Some((version, build)) if !build.is_empty() => version,
            Some(_) => return Err(malformed()),
            None => unprefixed,
        };

        let suffix_start = without_build
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(without_build.len());
        let (numeric, suffix) = without_build.split_at(suffix_start);

        let prerelease = if suffix.is_empty() {
            None
        } else {
            let tag = suffix.strip_prefix('-').unwrap_or(suffix);
            let is_valid_tag = tag.starts_with(|c: char| c.is_ascii_alphanumeric())
                && tag
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

            if !is_valid_tag {
                return Err(malformed());
            }
            Some(tag.to_string())
        };

        let mut segments = numeric.split('.');
        let major = segments
            .next()
            .and_then(parse_numeric_segment)
            .ok_or_else(malformed)?;
        let minor = segments
            .next()
            .map(|segment| parse_numeric_segment(segment).ok_or_else(malformed))
            .transpose()?;
        let patch = segments
            .next()
            .map(|segment| parse_numeric_segment(segment).ok_or_else(malformed))
            .transpose()?;

        if segments.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
            original: trimmed.to_string(),
        })
    }
}

fn parse_numeric_segment(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        None
    } else {
        segment.parse().ok()
    }
}

impl TryFrom<String> for SemanticVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SemanticVersion> for String {
    fn from(version: SemanticVersion) -> Self {
        version.original
    }
}

impl Display for SemanticVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_key()
            .cmp(&other.numeric_key())
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

/// Strips a Ruby style patch level suffix, e.g. `2.6.7p450` becomes `2.6.7`.
///
/// Strings without a patch level are returned unchanged.
#[must_use]
pub fn strip_patch_level(version: &str) -> &str {
    match version.rsplit_once('p') {
        Some((numeric, level))
            if numeric.ends_with(|c: char| c.is_ascii_digit())
                && !level.is_empty()
                && level.bytes().all(|byte| byte.is_ascii_digit()) =>
        {
            numeric
        }
        _ => version,
    }
}
