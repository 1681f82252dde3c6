use crate::go_version::GoVersionError;
use crate::layers::go::GoLayerError;
use crate::toolchain::{ResolveGoVersionError, GO_VERSION_ENV_VAR};
use crate::GoBuildpackError;
use buildpack_commons::{ErrorKind, VersionError};
use indoc::formatdoc;
use libherokubuildpack::log::log_error;

pub(crate) fn on_error(error: libcnb::Error<GoBuildpackError>) {
    libherokubuildpack::error::on_error(on_buildpack_error, error);
}

fn on_buildpack_error(error: GoBuildpackError) {
    let (header, details) = error_message(&error);

    match error.kind() {
        ErrorKind::User => log_error(header, details),
        ErrorKind::Internal => log_internal_error(header, &details),
    }
}

impl GoBuildpackError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            GoBuildpackError::DetectIo(_) => ErrorKind::Internal,
            GoBuildpackError::RequestedVersion(error)
            | GoBuildpackError::ResolveGoVersion(ResolveGoVersionError::Version(error))
            | GoBuildpackError::Toolchain(error) => error.kind(),
            GoBuildpackError::ResolveGoVersion(ResolveGoVersionError::Catalog(error)) => {
                error.kind()
            }
            GoBuildpackError::GoVersion(error) => error.kind(),
            GoBuildpackError::GoLayer(error) => error.kind(),
            GoBuildpackError::GoModDownload(error) | GoBuildpackError::GoBuild(error) => {
                error.kind()
            }
            GoBuildpackError::BuilderMetadata(error) => error.kind(),
        }
    }
}

fn error_message(error: &GoBuildpackError) -> (&'static str, String) {
    match error {
        GoBuildpackError::DetectIo(io_error) => (
            "Unable to check for Go project files",
            format!("An I/O error occurred while checking the app directory: {io_error}"),
        ),
        GoBuildpackError::RequestedVersion(version_error) => (
            "Invalid Go version",
            formatdoc! {"
                The Go version in the {GO_VERSION_ENV_VAR} environment variable is invalid:
                {version_error}

                Use an exact version such as `1.22.4`, or a constraint such as `>=1.22`.
            "},
        ),
        GoBuildpackError::ResolveGoVersion(ResolveGoVersionError::Version(version_error))
        | GoBuildpackError::Toolchain(version_error) => version_error_message(version_error),
        GoBuildpackError::ResolveGoVersion(ResolveGoVersionError::Catalog(catalog_error)) => (
            "Unable to fetch Go versions",
            formatdoc! {"
                {catalog_error}

                Setting {GO_VERSION_ENV_VAR} to an exact version skips the version lookup.
            "},
        ),
        GoBuildpackError::GoVersion(go_version_error) => match go_version_error {
            GoVersionError::ReadDescriptor(io_error) => (
                "Unable to read go.mod or go.work",
                io_error.to_string(),
            ),
            GoVersionError::ReadToolchainVersion(io_error) => (
                "Unable to determine the Go toolchain version",
                format!("Running `go version` failed: {io_error}"),
            ),
            GoVersionError::ToolchainNotFound => (
                "Unable to determine the Go toolchain version",
                String::from("The Go toolchain couldn't be found after it was installed."),
            ),
            GoVersionError::UnexpectedToolchainOutput(output) => (
                "Unable to determine the Go toolchain version",
                format!("`go version` printed output that couldn't be parsed: {output}"),
            ),
        },
        GoBuildpackError::GoLayer(GoLayerError::Download(download_error)) => (
            "Unable to download Go",
            formatdoc! {"
                An error occurred while downloading the Go toolchain:
                {download_error}

                If the version was requested with {GO_VERSION_ENV_VAR}, check that it is a
                released version of Go.
            "},
        ),
        GoBuildpackError::GoLayer(GoLayerError::Extract(io_error)) => (
            "Unable to install Go",
            format!("An I/O error occurred while extracting the Go toolchain: {io_error}"),
        ),
        GoBuildpackError::GoModDownload(command_error) => (
            "Unable to download Go modules",
            formatdoc! {"
                {command_error}

                See the log output above for details.
            "},
        ),
        GoBuildpackError::GoBuild(command_error) => (
            "Unable to build the application",
            formatdoc! {"
                {command_error}

                See the log output above for details.
            "},
        ),
        GoBuildpackError::BuilderMetadata(metadata_error) => (
            "Unable to record builder metadata",
            metadata_error.to_string(),
        ),
    }
}

fn version_error_message(error: &VersionError) -> (&'static str, String) {
    let header = match error {
        VersionError::MalformedVersion(_) => "Invalid Go version",
        VersionError::NoMatchingVersion { .. } => "Requested Go version not available",
        VersionError::UnsupportedVersion { .. } => "Unsupported Go version",
    };

    (
        header,
        formatdoc! {"
            {error}

            Choose a different version with the {GO_VERSION_ENV_VAR} environment variable, or
            update the `go` directive in go.mod or go.work.
        "},
    )
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
    use buildpack_commons::catalog::Catalog;
    use std::io;

    #[test]
    fn io_failures_are_internal_errors() {
        for error in [
            GoBuildpackError::DetectIo(io::Error::from(io::ErrorKind::PermissionDenied)),
            GoBuildpackError::GoVersion(GoVersionError::ReadDescriptor(io::Error::from(
                io::ErrorKind::PermissionDenied,
            ))),
            GoBuildpackError::GoVersion(GoVersionError::ReadToolchainVersion(io::Error::from(
                io::ErrorKind::NotFound,
            ))),
            GoBuildpackError::GoLayer(GoLayerError::Extract(io::Error::from(
                io::ErrorKind::Other,
            ))),
        ] {
            assert_eq!(error.kind(), ErrorKind::Internal, "{error:?}");
        }
    }

    #[test]
    fn catalog_failures_are_internal_errors() {
        let error = GoBuildpackError::ResolveGoVersion(ResolveGoVersionError::Catalog(
            Catalog::from_json("{").unwrap_err(),
        ));

        assert_eq!(error.kind(), ErrorKind::Internal);
    }

    #[test]
    fn version_errors_are_user_errors() {
        let error = GoBuildpackError::Toolchain(VersionError::UnsupportedVersion {
            detected: String::from("1.21.9"),
            minimum: String::from("1.22"),
        });
        let (header, details) = error_message(&error);

        assert_eq!(error.kind(), ErrorKind::User);
        assert_eq!(header, "Unsupported Go version");
        assert!(details.contains(GO_VERSION_ENV_VAR));
    }
}
