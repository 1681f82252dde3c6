mod compile;
mod errors;
mod go_version;
mod layers;
mod toolchain;

use crate::go_version::{GoVersionError, GoVersions};
use crate::layers::go::GoLayerError;
use crate::toolchain::{ResolveGoVersionError, GO_VERSION_ENV_VAR};
use buildpack_commons::catalog::Catalog;
use buildpack_commons::command::StreamedCommandError;
use buildpack_commons::constraint::{Operator, VersionConstraint};
use buildpack_commons::metadata::{
    metadata_path, BuilderMetadata, MetadataError, MetadataKey, METADATA_PATH_ENV_VAR,
};
use buildpack_commons::{SemanticVersion, VersionError};
use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::data::launch::{LaunchBuilder, ProcessBuilder};
use libcnb::data::{layer_name, process_type};
use libcnb::detect::{DetectContext, DetectResult, DetectResultBuilder};
use libcnb::generic::GenericPlatform;
use libcnb::layer::UncachedLayerDefinition;
use libcnb::layer_env::Scope;
use libcnb::{buildpack_main, Buildpack, Env, Platform};
use libherokubuildpack::log::{log_header, log_info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{fs, io};

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use libcnb_test as _;

pub(crate) struct GoBuildpack;

/// Configuration from the `[metadata]` table of `buildpack.toml`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct GoBuildpackMetadata {
    /// JSON list of Go releases.
    pub(crate) catalog_url: String,
    /// Toolchain tarball URL, with `{version}` and `{arch}` placeholders.
    pub(crate) download_url: String,
    pub(crate) minimum_go_version: SemanticVersion,
}

impl Buildpack for GoBuildpack {
    type Platform = GenericPlatform;
    type Metadata = GoBuildpackMetadata;
    type Error = GoBuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        if is_go_project(&context.app_dir).map_err(GoBuildpackError::DetectIo)? {
            DetectResultBuilder::pass().build()
        } else {
            log_info("No Go project files found (go.mod, go.work or *.go).");
            DetectResultBuilder::fail().build()
        }
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        let buildpack_metadata = &context.buildpack_descriptor.metadata;
        let platform_env = context.platform.env();

        log_header("Determining Go version");
        let constraint = platform_env
            .get(GO_VERSION_ENV_VAR)
            .map(|value| value.to_string_lossy().parse::<VersionConstraint>())
            .transpose()
            .map_err(GoBuildpackError::RequestedVersion)?
            .unwrap_or(VersionConstraint::Any);
        log_info(format!("Requested Go version: {constraint}"));

        let go_version = toolchain::resolve_go_version(&constraint, || {
            Catalog::fetch(&buildpack_metadata.catalog_url)
        })
        .map_err(GoBuildpackError::ResolveGoVersion)?;
        log_info(format!("Resolved Go version: {go_version}"));

        toolchain::check_toolchain(
            &go_version,
            GoVersions::without_toolchain(&context.app_dir)
                .source_version()
                .map_err(GoBuildpackError::GoVersion)?
                .as_ref(),
            &buildpack_metadata.minimum_go_version,
        )
        .map_err(GoBuildpackError::Toolchain)?;

        log_header("Installing Go");
        let go_toolchain = layers::go::install_go(&context, &go_version)?;
        let go_binary = go_toolchain.go_binary();
        let go_versions = GoVersions::for_app(&context.app_dir, &go_binary);
        log_info(format!(
            "Installed Go {}",
            go_versions
                .installed_version()
                .map_err(GoBuildpackError::GoVersion)?
        ));

        let has_module_descriptor = ["go.mod", "go.work"]
            .iter()
            .any(|name| context.app_dir.join(name).is_file());
        let module_cache = has_module_descriptor
            && go_versions
                .version_matches(&VersionConstraint::Compare(
                    Operator::GreaterOrEqual,
                    SemanticVersion::new(1, 13, 0),
                ))
                .map_err(GoBuildpackError::GoVersion)?;
        let gopath = layers::gopath::create_gopath(&context, module_cache)?;

        let mut env = Env::from_current();
        env = go_toolchain.env.apply(Scope::Build, &env);
        env = gopath.env.apply(Scope::Build, &env);

        let vendored = context.app_dir.join("vendor").is_dir();
        if has_module_descriptor && !vendored {
            log_header("Downloading modules");
            let goproxy = platform_env
                .get("GOPROXY")
                .map(|value| value.to_string_lossy().to_string())
                .or_else(|| std::env::var("GOPROXY").ok())
                .filter(|value| !value.is_empty());
            compile::download_modules(&go_binary, &context.app_dir, &env, goproxy.as_deref())
                .map_err(GoBuildpackError::GoModDownload)?;
            log_info(format!("Modules downloaded to {}", gopath.path.display()));
        }

        log_header("Building application");
        let vendor_flag = vendored
            && has_module_descriptor
            && !go_versions
                .supports_auto_vendor()
                .map_err(GoBuildpackError::GoVersion)?;
        let bin_layer = context.uncached_layer(
            layer_name!("bin"),
            UncachedLayerDefinition {
                build: false,
                launch: true,
            },
        )?;
        let binary = bin_layer.path().join("main");
        compile::build_binary(&go_binary, &context.app_dir, &env, &binary, vendor_flag)
            .map_err(GoBuildpackError::GoBuild)?;
        log_info(format!("Application binary written to {}", binary.display()));

        let mut builder_metadata = BuilderMetadata::new();
        builder_metadata
            .set(MetadataKey::Runtime, "go")
            .set(MetadataKey::RuntimeVersion, go_version.as_str());
        builder_metadata
            .merge_into_file(metadata_path(
                platform_env.get(METADATA_PATH_ENV_VAR).map(PathBuf::from),
                &context.layers_dir,
            ))
            .map_err(GoBuildpackError::BuilderMetadata)?;

        BuildResultBuilder::new()
            .launch(
                LaunchBuilder::new()
                    .process(
                        ProcessBuilder::new(
                            process_type!("web"),
                            [binary.to_string_lossy().to_string()],
                        )
                        .default(true)
                        .build(),
                    )
                    .build(),
            )
            .build()
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        errors::on_error(error);
    }
}

fn is_go_project(app_dir: &Path) -> io::Result<bool> {
    if app_dir.join("go.mod").is_file() || app_dir.join("go.work").is_file() {
        return Ok(true);
    }

    for entry in fs::read_dir(app_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|extension| extension == "go") {
            return Ok(true);
        }
    }

    Ok(false)
}

#[derive(Debug)]
pub(crate) enum GoBuildpackError {
    DetectIo(io::Error),
    RequestedVersion(VersionError),
    ResolveGoVersion(ResolveGoVersionError),
    Toolchain(VersionError),
    GoVersion(GoVersionError),
    GoLayer(GoLayerError),
    GoModDownload(StreamedCommandError),
    GoBuild(StreamedCommandError),
    BuilderMetadata(MetadataError),
}

impl From<GoBuildpackError> for libcnb::Error<GoBuildpackError> {
    fn from(error: GoBuildpackError) -> Self {
        Self::BuildpackError(error)
    }
}

buildpack_main!(GoBuildpack);

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_module_descriptors() {
        for descriptor in ["go.mod", "go.work"] {
            let app_dir = tempdir().unwrap();
            fs::write(app_dir.path().join(descriptor), "go 1.22\n").unwrap();

            assert!(is_go_project(app_dir.path()).unwrap(), "{descriptor}");
        }
    }

    #[test]
    fn detects_go_source_files() {
        let app_dir = tempdir().unwrap();
        fs::write(app_dir.path().join("main.go"), "package main\n").unwrap();

        assert!(is_go_project(app_dir.path()).unwrap());
    }

    #[test]
    fn ignores_other_projects() {
        let app_dir = tempdir().unwrap();
        fs::write(app_dir.path().join("Gemfile"), "").unwrap();
        fs::create_dir(app_dir.path().join("src.go")).unwrap();

        assert!(!is_go_project(app_dir.path()).unwrap());
    }

    #[test]
    fn parses_buildpack_metadata() {
        let metadata: GoBuildpackMetadata = toml::from_str(indoc::indoc! {r#"
            catalog-url = "https://go.dev/dl/?mode=json&include=all"
            download-url = "https://dl.google.com/go/go{version}.linux-{arch}.tar.gz"
            minimum-go-version = "1.11"
        "#})
        .unwrap();

        assert_eq!(metadata.minimum_go_version, SemanticVersion::new(1, 11, 0));
    }
}
