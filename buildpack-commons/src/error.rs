/// Distinguishes failures caused by the application from failures of the build environment.
///
/// Buildpacks use this to decide how an error is presented: user errors explain what to change in
/// the application, internal errors are reported as a problem with the buildpack or platform.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    User,
    Internal,
}

/// Errors related to version parsing, resolution and compatibility checks.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum VersionError {
    #[error("Malformed version {0:?}")]
    MalformedVersion(String),

    #[error("No available version satisfies the constraint {constraint:?}")]
    NoMatchingVersion { constraint: String },

    #[error("Version {detected} is not supported, the minimum supported version is {minimum}")]
    UnsupportedVersion { detected: String, minimum: String },
}

impl VersionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            VersionError::MalformedVersion(_)
            | VersionError::NoMatchingVersion { .. }
            | VersionError::UnsupportedVersion { .. } => ErrorKind::User,
        }
    }
}
