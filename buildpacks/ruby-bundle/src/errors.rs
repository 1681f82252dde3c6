use crate::gemfile::LockfileError;
use crate::{RubyBundleBuildpackError, RUBY_VERSION_ENV_VAR};
use buildpack_commons::ErrorKind;
use indoc::formatdoc;
use libherokubuildpack::log::log_error;

pub(crate) fn on_error(error: libcnb::Error<RubyBundleBuildpackError>) {
    libherokubuildpack::error::on_error(on_buildpack_error, error);
}

fn on_buildpack_error(error: RubyBundleBuildpackError) {
    let (header, details) = error_message(&error);

    match error.kind() {
        ErrorKind::User => log_error(header, details),
        ErrorKind::Internal => log_internal_error(header, &details),
    }
}

impl RubyBundleBuildpackError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            RubyBundleBuildpackError::Lockfile(error) => error.kind(),
            RubyBundleBuildpackError::RubyVersion(error) => error.kind(),
            RubyBundleBuildpackError::PatchManifest(error) => error.kind(),
            RubyBundleBuildpackError::LockfileChecksum(_) => ErrorKind::Internal,
            RubyBundleBuildpackError::BundleCommand(error) => error.kind(),
            RubyBundleBuildpackError::BuilderMetadata(error) => error.kind(),
        }
    }
}

fn error_message(error: &RubyBundleBuildpackError) -> (&'static str, String) {
    match error {
        RubyBundleBuildpackError::Lockfile(LockfileError::Read(io_error)) => (
            "Unable to read the lockfile",
            format!("An I/O error occurred while reading Gemfile.lock or gems.locked: {io_error}"),
        ),
        RubyBundleBuildpackError::Lockfile(LockfileError::Version(version_error)) => (
            "Invalid lockfile",
            formatdoc! {"
                A version in Gemfile.lock or gems.locked couldn't be parsed:
                {version_error}

                Regenerate the lockfile with `bundle lock` and commit the result.
            "},
        ),
        RubyBundleBuildpackError::RubyVersion(version_error) => (
            "Invalid Ruby version",
            formatdoc! {"
                {version_error}

                Check the {RUBY_VERSION_ENV_VAR} environment variable and the `ruby` entry
                in the RUBY VERSION section of the lockfile.
            "},
        ),
        RubyBundleBuildpackError::PatchManifest(patch_error) => (
            "Unable to add bundled gems to the gem manifest",
            patch_error.to_string(),
        ),
        RubyBundleBuildpackError::LockfileChecksum(io_error) => (
            "Unable to calculate the lockfile checksum",
            format!("An I/O error occurred while reading the lockfile: {io_error}"),
        ),
        RubyBundleBuildpackError::BundleCommand(command_error) => (
            "Unable to install gems",
            formatdoc! {"
                {command_error}

                See the Bundler output above for details. Make sure the lockfile is up to date
                by running `bundle install` locally and committing Gemfile.lock.
            "},
        ),
        RubyBundleBuildpackError::BuilderMetadata(metadata_error) => (
            "Unable to record builder metadata",
            metadata_error.to_string(),
        ),
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
