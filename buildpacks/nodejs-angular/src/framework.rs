use crate::package_json::{NodeDependencies, ANGULAR_CORE};
use buildpack_commons::gate::{check_minimum_version, GateOutcome};
use buildpack_commons::{SemanticVersion, VersionError};
use indoc::formatdoc;
use libherokubuildpack::log::log_warning;

/// The Angular version the app is built with.
///
/// The lockfile is authoritative. If it can't be read, the requirement from `package.json` is
/// used instead, which may well be a range like `^18.0.0`.
pub(crate) fn angular_version(deps: &NodeDependencies) -> Option<String> {
    match deps.locked_version(ANGULAR_CORE) {
        Ok(Some(version)) => return Some(version),
        Ok(None) => {}
        Err(_) => log_warning(
            "Unable to read package-lock.json",
            "Falling back to the Angular version requirement in package.json.",
        ),
    }

    deps.package_json
        .dependency_spec(ANGULAR_CORE)
        .map(String::from)
}

/// Fails for Angular versions below the minimum. Versions that can't be parsed only cause a
/// warning.
pub(crate) fn check_angular_version(
    version: &str,
    minimum: &SemanticVersion,
) -> Result<(), VersionError> {
    match check_minimum_version(version, minimum) {
        Ok(GateOutcome::Supported(_)) => Ok(()),
        Ok(GateOutcome::Unknown { detected, .. }) => {
            log_warning(
                "Unrecognized version of Angular",
                formatdoc! {"
                    Unrecognized version of angular: {detected}
                    Consider updating your angular dependencies to >={minimum}
                "},
            );
            Ok(())
        }
        Err(error) => {
            log_warning(
                "Unsupported version of Angular",
                format!("Update the angular dependencies to >={minimum}"),
            );
            Err(error)
        }
    }
}

/// The adapter release line matching the Angular version, `~<major>.<minor>.0`.
///
/// Adapter releases follow Angular's major and minor versions. If the Angular version is
/// unknown, the latest adapter is used.
pub(crate) fn adapter_version_requirement(angular_version: &str) -> String {
    match SemanticVersion::parse(angular_version) {
        Ok(version) => format!(
            "~{}.{}.0",
            version.major(),
            version.minor().unwrap_or_default()
        ),
        Err(_) => String::from("latest"),
    }
}

/// Whether the build script is one the adapter knows how to handle.
pub(crate) fn is_standard_build_script(script: &str, adapter_build_command: &str) -> bool {
    script == "ng build" || script == adapter_build_command
}
