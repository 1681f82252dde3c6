use buildpack_commons::catalog::{Catalog, CatalogError};
use buildpack_commons::constraint::VersionConstraint;
use buildpack_commons::gate::{check_minimum_version, GateOutcome};
use buildpack_commons::{SemanticVersion, VersionError};
use libherokubuildpack::log::log_warning;

/// Environment variable holding the requested Go version constraint.
pub(crate) const GO_VERSION_ENV_VAR: &str = "GO_VERSION";

/// Picks the Go version to install.
///
/// Exact constraints are used as-is, the catalog is only fetched for everything else.
pub(crate) fn resolve_go_version(
    constraint: &VersionConstraint,
    fetch_catalog: impl FnOnce() -> Result<Catalog, CatalogError>,
) -> Result<String, ResolveGoVersionError> {
    let catalog = if constraint.is_exact() {
        Catalog::default()
    } else {
        fetch_catalog()
            .map_err(ResolveGoVersionError::Catalog)?
            .strip_version_prefix("go")
    };

    constraint
        .resolve(&catalog)
        .map_err(ResolveGoVersionError::Version)
}

/// Makes sure the toolchain can build the application and is supported by this buildpack.
///
/// A toolchain version that can't be parsed is logged and otherwise trusted.
pub(crate) fn check_toolchain(
    toolchain: &str,
    source_version: Option<&SemanticVersion>,
    minimum: &SemanticVersion,
) -> Result<(), VersionError> {
    let mut outcomes = vec![check_minimum_version(toolchain, minimum)?];
    if let Some(source_version) = source_version {
        outcomes.push(check_minimum_version(toolchain, source_version)?);
    }

    if let Some(GateOutcome::Unknown { detected, reason }) = outcomes
        .into_iter()
        .find(|outcome| matches!(outcome, GateOutcome::Unknown { .. }))
    {
        log_warning(
            "Unrecognized Go version",
            format!("Couldn't check whether Go {detected} is supported: {reason}"),
        );
    }

    Ok(())
}

#[derive(Debug)]
pub(crate) enum ResolveGoVersionError {
    Catalog(CatalogError),
    Version(VersionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildpack_commons::catalog::CatalogEntry;

    fn catalog(entries: &[(&str, bool)]) -> Catalog {
        Catalog::new(
            entries
                .iter()
                .map(|(version, stable)| CatalogEntry::new(*version, *stable))
                .collect(),
        )
    }

    fn resolve(constraint: &str, entries: &[(&str, bool)]) -> String {
        resolve_go_version(&constraint.parse().unwrap(), || Ok(catalog(entries))).unwrap()
    }

    #[test]
    fn resolves_against_the_catalog() {
        assert_eq!(
            resolve("", &[("go1.16", true), ("go1.15.3", true), ("go1.12.12", true)]),
            "1.16"
        );
        assert_eq!(
            resolve("", &[("go1.15.4", false), ("go1.15.3", true), ("go1.12.12", true)]),
            "1.15.3"
        );
        assert_eq!(
            resolve(">=1.15.0", &[("go1.16", true), ("go1.15.3", true)]),
            "1.16"
        );
    }

    #[test]
    fn exact_versions_skip_the_catalog() {
        for version in ["1.12", "1.21rc2"] {
            assert_eq!(
                resolve_go_version(&version.parse().unwrap(), || {
                    panic!("catalog shouldn't be fetched")
                })
                .unwrap(),
                version
            );
        }
    }

    #[test]
    fn reports_unsatisfiable_constraints() {
        assert!(matches!(
            resolve_go_version(&">=2.0".parse().unwrap(), || Ok(catalog(&[("go1.16", true)]))),
            Err(ResolveGoVersionError::Version(VersionError::NoMatchingVersion { .. }))
        ));
    }

    #[test]
    fn toolchain_must_not_be_older_than_the_declared_version() {
        let minimum = SemanticVersion::new(1, 11, 0);
        let declared = SemanticVersion::parse("1.22").unwrap();

        assert_eq!(check_toolchain("1.22.4", Some(&declared), &minimum), Ok(()));
        assert_eq!(
            check_toolchain("1.21.9", Some(&declared), &minimum),
            Err(VersionError::UnsupportedVersion {
                detected: String::from("1.21.9"),
                minimum: String::from("1.22"),
            })
        );
    }

    #[test]
    fn toolchain_must_not_be_older_than_the_minimum() {
        let minimum = SemanticVersion::new(1, 11, 0);

        assert_eq!(check_toolchain("1.11", None, &minimum), Ok(()));
        assert_eq!(
            check_toolchain("1.10.8", None, &minimum),
            Err(VersionError::UnsupportedVersion {
                detected: String::from("1.10.8"),
                minimum: String::from("1.11.0"),
            })
        );
    }

    #[test]
    fn unparsable_toolchain_versions_are_trusted() {
        let minimum = SemanticVersion::new(1, 11, 0);

        assert_eq!(check_toolchain("tip", None, &minimum), Ok(()));
    }
}
