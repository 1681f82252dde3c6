mod bundle;
mod errors;
mod gemfile;
mod layers;

use crate::gemfile::{
    bundled_gems_patch, parse_bundler_version, parse_ruby_version, GemfilePaths, LockfileError,
};
use crate::layers::gems::GemsLayerMetadata;
use buildpack_commons::command::StreamedCommandError;
use buildpack_commons::manifest::PatchError;
use buildpack_commons::metadata::{
    metadata_path, BuilderMetadata, MetadataError, MetadataKey, METADATA_PATH_ENV_VAR,
};
use buildpack_commons::version::strip_patch_level;
use buildpack_commons::{SemanticVersion, VersionError};
use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::detect::{DetectContext, DetectResult, DetectResultBuilder};
use libcnb::generic::GenericPlatform;
use libcnb::{buildpack_main, Buildpack, Env, Platform};
use libherokubuildpack::digest::sha256;
use libherokubuildpack::log::{log_header, log_info};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use libcnb_test as _;

pub(crate) const RUBY_VERSION_ENV_VAR: &str = "RUBY_VERSION";

pub(crate) struct RubyBundleBuildpack;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RubyBundleBuildpackMetadata {
    /// First Ruby release that no longer ships the bundled gems as default gems.
    pub(crate) bundled_gems_ruby_version: SemanticVersion,
}

impl Buildpack for RubyBundleBuildpack {
    type Platform = GenericPlatform;
    type Metadata = RubyBundleBuildpackMetadata;
    type Error = RubyBundleBuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        if has_gem_manifest(&context.app_dir) {
            DetectResultBuilder::pass().build()
        } else {
            log_info("No Gemfile or gems.rb found.");
            DetectResultBuilder::fail().build()
        }
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        let platform_env = context.platform.env();
        let paths = GemfilePaths::for_app(&context.app_dir);
        let has_lockfile = paths.has_lockfile();

        log_header("Reading gem manifest");
        let ruby_version = requested_ruby_version(
            platform_env,
            std::env::var(RUBY_VERSION_ENV_VAR).ok(),
            &paths,
        )?;

        if let Some(ruby_version) = &ruby_version {
            log_info(format!("Ruby version: {ruby_version}"));
            let ruby_version = SemanticVersion::parse(ruby_version)
                .map_err(RubyBundleBuildpackError::RubyVersion)?;

            let added = bundled_gems_patch(
                context
                    .buildpack_descriptor
                    .metadata
                    .bundled_gems_ruby_version
                    .clone(),
            )
            .apply_to_file(&ruby_version, &paths.manifest)
            .map_err(RubyBundleBuildpackError::PatchManifest)?;
            if !added.is_empty() {
                log_info(format!(
                    "Adding bundled gems for Ruby {ruby_version}: {}",
                    added.join(", ")
                ));
            }
        } else {
            log_info("No Ruby version requested, skipping the bundled gems check");
        }

        let bundler_version = if has_lockfile {
            parse_bundler_version(&paths.lockfile).map_err(RubyBundleBuildpackError::Lockfile)?
        } else {
            None
        };
        let lockfile_checksum = if has_lockfile {
            Some(sha256(&paths.lockfile).map_err(RubyBundleBuildpackError::LockfileChecksum)?)
        } else {
            None
        };

        log_header("Installing gems");
        let gems_dir = layers::gems::create_gems_layer(
            &context,
            &GemsLayerMetadata {
                ruby_version: ruby_version.clone(),
                lockfile_checksum,
            },
        )?;
        bundle::install(&context.app_dir, &gems_dir, has_lockfile)
            .map_err(RubyBundleBuildpackError::BundleCommand)?;

        let mut builder_metadata = BuilderMetadata::new();
        builder_metadata.set(MetadataKey::Runtime, "ruby");
        if let Some(ruby_version) = ruby_version {
            builder_metadata.set(MetadataKey::RuntimeVersion, ruby_version);
        }
        if let Some(bundler_version) = bundler_version {
            builder_metadata.set(MetadataKey::BundlerVersion, bundler_version);
        }
        builder_metadata
            .merge_into_file(metadata_path(
                platform_env.get(METADATA_PATH_ENV_VAR).map(PathBuf::from),
                &context.layers_dir,
            ))
            .map_err(RubyBundleBuildpackError::BuilderMetadata)?;

        BuildResultBuilder::new().build()
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        errors::on_error(error);
    }
}

fn has_gem_manifest(app_dir: &Path) -> bool {
    ["Gemfile", "gems.rb"]
        .iter()
        .any(|name| app_dir.join(name).is_file())
}

/// The Ruby version set by the user or an earlier Ruby buildpack, falling back to the lockfile.
fn requested_ruby_version(
    platform_env: &Env,
    inherited: Option<String>,
    paths: &GemfilePaths,
) -> Result<Option<String>, RubyBundleBuildpackError> {
    let configured = platform_env
        .get(RUBY_VERSION_ENV_VAR)
        .map(|value| value.to_string_lossy().to_string())
        .or(inherited)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    match configured {
        Some(version) => Ok(Some(strip_patch_level(&version).to_string())),
        None if paths.has_lockfile() => {
            parse_ruby_version(&paths.lockfile).map_err(RubyBundleBuildpackError::Lockfile)
        }
        None => Ok(None),
    }
}

#[derive(Debug)]
pub(crate) enum RubyBundleBuildpackError {
    Lockfile(LockfileError),
    RubyVersion(VersionError),
    PatchManifest(PatchError),
    LockfileChecksum(io::Error),
    BundleCommand(StreamedCommandError),
    BuilderMetadata(MetadataError),
}

impl From<RubyBundleBuildpackError> for libcnb::Error<RubyBundleBuildpackError> {
    fn from(error: RubyBundleBuildpackError) -> Self {
        Self::BuildpackError(error)
    }
}

buildpack_main!(RubyBundleBuildpack);
