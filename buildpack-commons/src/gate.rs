use crate::error::VersionError;
use crate::version::SemanticVersion;

/// Outcome of a successful [`check_minimum_version`] call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GateOutcome {
    /// The detected version is at or above the minimum.
    Supported(SemanticVersion),
    /// The detected version couldn't be parsed. Callers are expected to warn and continue.
    Unknown { detected: String, reason: String },
}

/// Checks a detected version against the minimum supported version.
///
/// A version that can't be parsed is not an error: it's reported as [`GateOutcome::Unknown`] so
/// the build can trust the user and carry on. Only a parseable version below the minimum fails.
///
/// # Examples
/// ```
/// use buildpack_commons::gate::{check_minimum_version, GateOutcome};
/// use buildpack_commons::SemanticVersion;
///
/// let minimum = SemanticVersion::new(17, 2, 0);
///
/// assert!(matches!(check_minimum_version("17.3.1", &minimum), Ok(GateOutcome::Supported(_))));
/// assert!(matches!(check_minimum_version("^17.2", &minimum), Ok(GateOutcome::Unknown { .. })));
/// assert!(check_minimum_version("16.2.0", &minimum).is_err());
/// ```
pub fn check_minimum_version(
    detected: &str,
    minimum: &SemanticVersion,
) -> Result<GateOutcome, VersionError> {
    match SemanticVersion::parse(detected) {
        Ok(version) if &version < minimum => Err(VersionError::UnsupportedVersion {
            detected: version.to_string(),
            minimum: minimum.to_string(),
        }),
        Ok(version) => Ok(GateOutcome::Supported(version)),
        Err(error) => Ok(GateOutcome::Unknown {
            detected: detected.to_string(),
            reason: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_at_or_above_minimum_are_supported() {
        let minimum = SemanticVersion::new(17, 2, 0);

        for detected in ["17.2.0", "17.2", "17.10.1", "18"] {
            assert_eq!(
                check_minimum_version(detected, &minimum),
                Ok(GateOutcome::Supported(SemanticVersion::parse(detected).unwrap())),
                "{detected:?}"
            );
        }
    }

    #[test]
    fn versions_below_minimum_are_rejected() {
        let minimum = SemanticVersion::new(17, 2, 0);

        assert_eq!(
            check_minimum_version("17.1.3", &minimum),
            Err(VersionError::UnsupportedVersion {
                detected: String::from("17.1.3"),
                minimum: String::from("17.2.0"),
            })
        );
        assert!(check_minimum_version("17.2.0-rc.1", &minimum).is_err());
    }

    #[test]
    fn unparsable_versions_are_unknown() {
        let minimum = SemanticVersion::new(17, 2, 0);

        assert_eq!(
            check_minimum_version("~17.2.0", &minimum),
            Ok(GateOutcome::Unknown {
                detected: String::from("~17.2.0"),
                reason: String::from("Malformed version \"~17.2.0\""),
            })
        );
        assert!(matches!(
            check_minimum_version("", &minimum),
            Ok(GateOutcome::Unknown { .. })
        ));
    }
}
