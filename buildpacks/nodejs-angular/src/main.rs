mod errors;
mod framework;
mod layers;
mod package_json;

use crate::package_json::{NodeDependencies, PackageJsonError};
use buildpack_commons::command::StreamedCommandError;
use buildpack_commons::metadata::{
    metadata_path, BuilderMetadata, MetadataError, MetadataKey, METADATA_PATH_ENV_VAR,
};
use buildpack_commons::{SemanticVersion, VersionError};
use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::detect::{DetectContext, DetectResult, DetectResultBuilder};
use libcnb::generic::GenericPlatform;
use libcnb::{buildpack_main, Buildpack, Platform};
use libherokubuildpack::log::{log_header, log_info, log_warning};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use libcnb_test as _;

/// Environment variable that configures the adapter build for the Angular version in use.
pub(crate) const FRAMEWORK_VERSION_ENV_VAR: &str = "FRAMEWORK_VERSION";

pub(crate) struct AngularBuildpack;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct AngularBuildpackMetadata {
    pub(crate) minimum_angular_version: SemanticVersion,
    /// npm package name of the build adapter.
    pub(crate) adapter_package: String,
    /// Build script provided by the adapter.
    pub(crate) adapter_build_command: String,
}

impl Buildpack for AngularBuildpack {
    type Platform = GenericPlatform;
    type Metadata = AngularBuildpackMetadata;
    type Error = AngularBuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        if detect_angular(
            &context.app_dir,
            &context.buildpack_descriptor.metadata.adapter_build_command,
        )
        .map_err(AngularBuildpackError::PackageJson)?
        {
            DetectResultBuilder::pass().build()
        } else {
            DetectResultBuilder::fail().build()
        }
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        let buildpack_metadata = &context.buildpack_descriptor.metadata;

        log_header("Preparing Angular build");
        let deps =
            NodeDependencies::read(&context.app_dir).map_err(AngularBuildpackError::PackageJson)?;
        if deps.lockfile.is_none() {
            return Err(AngularBuildpackError::MissingLockfile.into());
        }

        let angular_version = framework::angular_version(&deps).unwrap_or_default();
        log_info(format!("Angular version: {angular_version}"));
        framework::check_angular_version(
            &angular_version,
            &buildpack_metadata.minimum_angular_version,
        )
        .map_err(AngularBuildpackError::UnsupportedVersion)?;

        if let Some(version) = deps
            .package_json
            .dependencies
            .get(&buildpack_metadata.adapter_package)
        {
            log_info(format!(
                "*** You already have {}@{version} listed as a dependency, skipping installation ***",
                buildpack_metadata.adapter_package
            ));
            log_info(format!(
                "*** Your package.json build command will be run as is, please make sure it is set to {} if you intend to build your app using the adapter ***",
                buildpack_metadata.adapter_build_command
            ));
            return BuildResultBuilder::new().build();
        }

        if let Some(build_script) = deps.package_json.build_script().filter(|script| {
            !framework::is_standard_build_script(script, &buildpack_metadata.adapter_build_command)
        }) {
            log_warning(
                "Custom build command",
                format!(
                    "Your build command is `{build_script}` and not `ng build`. It will be used as is, but the build fails if the output structure is not as expected."
                ),
            );
        }

        log_header("Installing Angular build adapter");
        let adapter_version = layers::npm_modules::install_adapter(&context, &angular_version)?;

        let mut builder_metadata = BuilderMetadata::new();
        builder_metadata
            .set(MetadataKey::FrameworkName, "angular")
            .set(MetadataKey::FrameworkVersion, angular_version.as_str())
            .set(
                MetadataKey::AdapterName,
                buildpack_metadata.adapter_package.as_str(),
            );
        if let Some(adapter_version) = adapter_version {
            builder_metadata.set(MetadataKey::AdapterVersion, adapter_version);
        }
        builder_metadata
            .merge_into_file(metadata_path(
                context
                    .platform
                    .env()
                    .get(METADATA_PATH_ENV_VAR)
                    .map(PathBuf::from),
                &context.layers_dir,
            ))
            .map_err(AngularBuildpackError::BuilderMetadata)?;

        BuildResultBuilder::new().build()
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        errors::on_error(error);
    }
}

/// Whether the app is an Angular app this buildpack should build.
///
/// A `package.json` that isn't valid JSON opts out with a warning instead of failing detection.
fn detect_angular(app_dir: &Path, adapter_build_command: &str) -> Result<bool, PackageJsonError> {
    if app_dir.join("angular.json").is_file() {
        return Ok(true);
    }

    // Some workspace setups, like Nx, work without an angular.json.
    if !app_dir.join("package.json").is_file() {
        log_info("No angular.json or package.json found.");
        return Ok(false);
    }

    match NodeDependencies::read(app_dir) {
        Ok(deps) => Ok(uses_angular(&deps, adapter_build_command)),
        Err(PackageJsonError::Json { path, source }) => {
            log_warning(
                "Invalid package.json",
                format!(
                    "Couldn't parse {}: {source}. Skipping Angular detection.",
                    path.display()
                ),
            );
            Ok(false)
        }
        Err(error) => Err(error),
    }
}

/// Whether `package.json` depends on Angular and leaves the adapter setup to this buildpack.
fn uses_angular(deps: &NodeDependencies, adapter_build_command: &str) -> bool {
    if deps.package_json.build_script() == Some(adapter_build_command) {
        log_info("The build script already runs the Angular build adapter.");
        return false;
    }

    framework::angular_version(deps).is_some()
}

#[derive(Debug)]
pub(crate) enum AngularBuildpackError {
    PackageJson(PackageJsonError),
    MissingLockfile,
    UnsupportedVersion(VersionError),
    AdapterInstall(StreamedCommandError),
    ReadAdapterVersion(PackageJsonError),
    BuilderMetadata(MetadataError),
}

impl From<AngularBuildpackError> for libcnb::Error<AngularBuildpackError> {
    fn from(error: AngularBuildpackError) -> Self {
        Self::BuildpackError(error)
    }
}

buildpack_main!(AngularBuildpack);
