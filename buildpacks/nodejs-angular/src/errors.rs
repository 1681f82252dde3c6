use crate::package_json::PackageJsonError;
use crate::AngularBuildpackError;
use buildpack_commons::ErrorKind;
use indoc::formatdoc;
use libherokubuildpack::log::log_error;

pub(crate) fn on_error(error: libcnb::Error<AngularBuildpackError>) {
    libherokubuildpack::error::on_error(on_buildpack_error, error);
}

fn on_buildpack_error(error: AngularBuildpackError) {
    let (header, details) = error_message(&error);

    match error.kind() {
        ErrorKind::User => log_error(header, details),
        ErrorKind::Internal => log_internal_error(header, &details),
    }
}

impl AngularBuildpackError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            AngularBuildpackError::PackageJson(error) => error.kind(),
            AngularBuildpackError::MissingLockfile => ErrorKind::User,
            AngularBuildpackError::UnsupportedVersion(error) => error.kind(),
            AngularBuildpackError::AdapterInstall(error) => error.kind(),
            AngularBuildpackError::ReadAdapterVersion(_) => ErrorKind::Internal,
            AngularBuildpackError::BuilderMetadata(error) => error.kind(),
        }
    }
}

fn error_message(error: &AngularBuildpackError) -> (&'static str, String) {
    match error {
        AngularBuildpackError::PackageJson(package_json_error @ PackageJsonError::Json { .. }) => (
            "Invalid package.json",
            formatdoc! {"
                {details}

                Make sure package.json and package-lock.json are valid JSON.
            ", details = describe_package_json_error(package_json_error)},
        ),
        AngularBuildpackError::PackageJson(package_json_error) => (
            "Unable to read package.json",
            describe_package_json_error(package_json_error),
        ),
        AngularBuildpackError::MissingLockfile => (
            "Missing lockfile",
            formatdoc! {"
                No package-lock.json was found in the app directory.

                Run `npm install` locally and commit the generated package-lock.json.
            "},
        ),
        AngularBuildpackError::UnsupportedVersion(version_error) => (
            "Unsupported Angular version",
            formatdoc! {"
                {version_error}

                Update @angular/core and the other Angular packages in package.json, then
                regenerate package-lock.json.
            "},
        ),
        AngularBuildpackError::AdapterInstall(command_error) => (
            "Unable to install the Angular build adapter",
            formatdoc! {"
                {command_error}

                See the npm output above for details.
            "},
        ),
        AngularBuildpackError::ReadAdapterVersion(package_json_error) => (
            "Unable to read the version of the installed build adapter",
            describe_package_json_error(package_json_error),
        ),
        AngularBuildpackError::BuilderMetadata(metadata_error) => (
            "Unable to record builder metadata",
            metadata_error.to_string(),
        ),
    }
}

fn describe_package_json_error(error: &PackageJsonError) -> String {
    match error {
        PackageJsonError::Io { path, source } => {
            format!("Couldn't read {}: {source}", path.display())
        }
        PackageJsonError::Json { path, source } => {
            format!("Couldn't parse {}: {source}", path.display())
        }
    }
}

fn log_internal_error(context: &str, details: &str) {
    log_error(
        "Internal Buildpack Error",
        formatdoc! {"
            {context}.
            {details}

            This is a problem with the buildpack or the build environment, not the app.
        "},
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn package_json_io_error() -> PackageJsonError {
        PackageJsonError::Io {
            path: PathBuf::from("/workspace/package.json"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        }
    }

    fn package_json_syntax_error() -> PackageJsonError {
        PackageJsonError::Json {
            path: PathBuf::from("/workspace/package.json"),
            source: serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err(),
        }
    }

    #[test]
    fn unreadable_package_json_is_an_internal_error() {
        let error = AngularBuildpackError::PackageJson(package_json_io_error());
        let (header, details) = error_message(&error);

        assert_eq!(error.kind(), ErrorKind::Internal);
        assert_eq!(header, "Unable to read package.json");
        assert!(!details.contains("valid JSON"));
    }

    #[test]
    fn invalid_package_json_is_a_user_error() {
        let error = AngularBuildpackError::PackageJson(package_json_syntax_error());
        let (header, details) = error_message(&error);

        assert_eq!(error.kind(), ErrorKind::User);
        assert_eq!(header, "Invalid package.json");
        assert!(details.contains("valid JSON"));
    }

    #[test]
    fn adapter_version_errors_are_internal() {
        assert_eq!(
            AngularBuildpackError::ReadAdapterVersion(package_json_syntax_error()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(AngularBuildpackError::MissingLockfile.kind(), ErrorKind::User);
    }
}
