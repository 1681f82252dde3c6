use crate::catalog::{Catalog, CatalogEntry};
use crate::error::VersionError;
use crate::version::SemanticVersion;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A requirement on a runtime version.
///
/// Parsed from strings such as `>=1.15.0`, `<3`, `=1.22` or `1.21rc2`. An empty string means any
/// version. A bare version without an operator is an exact literal: it is used as-is and never
/// compared against a catalog, which allows requesting releases the catalog doesn't list (such
/// as old or pre-release versions).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VersionConstraint {
    Any,
    Exact(String),
    Compare(Operator, SemanticVersion),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operator {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Operator {
    fn matches(self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::GreaterOrEqual => ordering != Ordering::Less,
            Operator::Less => ordering == Ordering::Less,
            Operator::LessOrEqual => ordering != Ordering::Greater,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
        }
    }
}

impl VersionConstraint {
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self, VersionConstraint::Exact(_))
    }

    #[must_use]
    pub fn satisfied_by(&self, version: &SemanticVersion) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(literal) => version.to_string() == *literal,
            VersionConstraint::Compare(operator, operand) => operator.matches(version.cmp(operand)),
        }
    }

    /// Selects the version to install from the given catalog.
    ///
    /// Exact constraints resolve to their literal without consulting the catalog. Otherwise the
    /// highest stable entry that satisfies the constraint wins. If no stable entry qualifies, the
    /// highest satisfying entry overall is used, preferring stable entries on equal versions.
    /// Entries whose version can't be parsed are skipped.
    ///
    /// # Examples
    /// ```
    /// use buildpack_commons::catalog::{Catalog, CatalogEntry};
    /// use buildpack_commons::constraint::VersionConstraint;
    ///
    /// let catalog = Catalog::new(vec![
    ///     CatalogEntry::new("1.15.4", false),
    ///     CatalogEntry::new("1.15.3", true),
    ///     CatalogEntry::new("1.12.12", true),
    /// ]);
    ///
    /// let any: VersionConstraint = "".parse().unwrap();
    /// assert_eq!(any.resolve(&catalog).unwrap(), "1.15.3");
    ///
    /// let exact: VersionConstraint = "1.12".parse().unwrap();
    /// assert_eq!(exact.resolve(&catalog).unwrap(), "1.12");
    /// ```
    pub fn resolve(&self, catalog: &Catalog) -> Result<String, VersionError> {
        if let VersionConstraint::Exact(literal) = self {
            return Ok(literal.clone());
        }

        let candidates = catalog
            .entries()
            .iter()
            .filter_map(|entry| {
                SemanticVersion::parse(&entry.version)
                    .ok()
                    .filter(|version| self.satisfied_by(version))
                    .map(|version| (version, entry))
            })
            .collect::<Vec<_>>();

        let highest_stable = candidates
            .iter()
            .filter(|(_, entry)| entry.stable)
            .max_by(|a, b| compare_candidates(a, b));

        highest_stable
            .or_else(|| candidates.iter().max_by(|a, b| compare_candidates(a, b)))
            .map(|(_, entry)| entry.version.clone())
            .ok_or_else(|| VersionError::NoMatchingVersion {
                constraint: self.to_string(),
            })
    }
}

fn compare_candidates(
    (a_version, a_entry): &(SemanticVersion, &CatalogEntry),
    (b_version, b_entry): &(SemanticVersion, &CatalogEntry),
) -> Ordering {
    a_version
        .cmp(b_version)
        .then_with(|| a_entry.stable.cmp(&b_entry.stable))
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Ok(VersionConstraint::Any);
        }

        // Two character operators have to be checked first.
        let operators = [
            (">=", Operator::GreaterOrEqual),
            ("<=", Operator::LessOrEqual),
            (">", Operator::Greater),
            ("<", Operator::Less),
            ("=", Operator::Equal),
        ];

        for (prefix, operator) in operators {
            if let Some(operand) = trimmed.strip_prefix(prefix) {
                return SemanticVersion::parse(operand.trim())
                    .map(|version| VersionConstraint::Compare(operator, version))
                    .map_err(|_| VersionError::MalformedVersion(input.to_string()));
            }
        }

        SemanticVersion::parse(trimmed)
            .map(|_| VersionConstraint::Exact(trimmed.to_string()))
            .map_err(|_| VersionError::MalformedVersion(input.to_string()))
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => f.write_str("*"),
            VersionConstraint::Exact(literal) => f.write_str(literal),
            VersionConstraint::Compare(operator, version) => {
                write!(f, "{}{version}", operator.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(input: &str) -> VersionConstraint {
        input.parse().unwrap()
    }

    fn go_catalog(entries: &[(&str, bool)]) -> Catalog {
        Catalog::new(
            entries
                .iter()
                .map(|(version, stable)| CatalogEntry::new(*version, *stable))
                .collect(),
        )
        .strip_version_prefix("go")
    }

    #[test]
    fn parses_constraints() {
        assert_eq!(constraint(""), VersionConstraint::Any);
        assert_eq!(constraint("  "), VersionConstraint::Any);
        assert_eq!(
            constraint(">=1.15.0"),
            VersionConstraint::Compare(Operator::GreaterOrEqual, SemanticVersion::new(1, 15, 0))
        );
        assert_eq!(
            constraint("< 3"),
            VersionConstraint::Compare(Operator::Less, SemanticVersion::new(3, 0, 0))
        );
        assert_eq!(
            constraint("1.21rc2"),
            VersionConstraint::Exact(String::from("1.21rc2"))
        );
    }

    #[test]
    fn rejects_malformed_operands() {
        for input in [">=", ">=1.", "latest", "=>1.0", "1.2.3.4"] {
            assert_eq!(
                input.parse::<VersionConstraint>(),
                Err(VersionError::MalformedVersion(input.to_string())),
                "{input:?}"
            );
        }
    }

    #[test]
    fn renders_constraints() {
        assert_eq!(constraint(">=1.15").to_string(), ">=1.15");
        assert_eq!(constraint("1.12").to_string(), "1.12");
        assert_eq!(constraint("").to_string(), "*");
    }

    #[test]
    fn comparison_operators() {
        let version = SemanticVersion::parse("1.15").unwrap();

        assert!(constraint("=1.15.0").satisfied_by(&version));
        assert!(constraint(">=1.15.0").satisfied_by(&version));
        assert!(constraint("<=1.15").satisfied_by(&version));
        assert!(constraint(">1.14.9").satisfied_by(&version));
        assert!(constraint("<1.16").satisfied_by(&version));
        assert!(!constraint(">1.15.0").satisfied_by(&version));
        assert!(!constraint("<1.15").satisfied_by(&version));
    }

    #[test]
    fn resolves_highest_satisfying_stable_version() {
        let catalog = go_catalog(&[("go1.16", true), ("go1.15.3", true), ("go1.12.12", true)]);

        assert_eq!(constraint(">=1.15.0").resolve(&catalog).unwrap(), "1.16");
        assert_eq!(constraint("<1.16").resolve(&catalog).unwrap(), "1.15.3");
        assert_eq!(constraint("").resolve(&catalog).unwrap(), "1.16");
    }

    #[test]
    fn prefers_newest_stable_over_newer_unstable() {
        let catalog = go_catalog(&[("go1.15.4", false), ("go1.15.3", true), ("go1.12.12", true)]);

        assert_eq!(constraint("").resolve(&catalog).unwrap(), "1.15.3");
    }

    #[test]
    fn falls_back_to_unstable_when_no_stable_version_qualifies() {
        let catalog = go_catalog(&[("go1.22rc1", false), ("go1.21.5", true), ("go1.22rc2", false)]);

        assert_eq!(constraint(">1.21.5").resolve(&catalog).unwrap(), "1.22rc2");
    }

    #[test]
    fn unsorted_catalogs_are_sorted_internally() {
        let catalog = go_catalog(&[("go1.12.12", true), ("go1.16", true), ("go1.15.3", true)]);

        assert_eq!(constraint("").resolve(&catalog).unwrap(), "1.16");
    }

    #[test]
    fn exact_constraints_bypass_the_catalog() {
        let catalog = go_catalog(&[("go1.15.4", false), ("go1.15.3", true), ("go1.12.12", true)]);

        assert_eq!(constraint("1.12").resolve(&catalog).unwrap(), "1.12");
        assert_eq!(constraint("1.21rc2").resolve(&catalog).unwrap(), "1.21rc2");
        assert_eq!(
            constraint("1.21rc2").resolve(&Catalog::default()).unwrap(),
            "1.21rc2"
        );
    }

    #[test]
    fn only_bare_versions_are_exact() {
        assert!(constraint("1.12").is_exact());
        assert!(constraint("1.21rc2").is_exact());
        assert!(!constraint("").is_exact());
        assert!(!constraint("=1.12").is_exact());
        assert!(!constraint(">=1.12").is_exact());
    }

    #[test]
    fn fails_when_nothing_matches() {
        let catalog = go_catalog(&[("go1.16", true)]);

        assert_eq!(
            constraint(">=2.0").resolve(&catalog),
            Err(VersionError::NoMatchingVersion {
                constraint: String::from(">=2.0"),
            })
        );
        assert_eq!(
            constraint("").resolve(&Catalog::default()),
            Err(VersionError::NoMatchingVersion {
                constraint: String::from("*"),
            })
        );
    }

    #[test]
    fn skips_unparsable_catalog_entries() {
        let catalog = go_catalog(&[("gotip", true), ("go1.16", true)]);

        assert_eq!(constraint("").resolve(&catalog).unwrap(), "1.16");
    }
}
