use crate::{GoBuildpack, GoBuildpackError};
use buildpack_commons::ErrorKind;
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::layer::{
    CachedLayerDefinition, InvalidMetadataAction, LayerState, RestoredLayerAction,
};
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use libherokubuildpack::download::{download_file, DownloadError};
use libherokubuildpack::fs::move_directory_contents;
use libherokubuildpack::log::log_info;
use libherokubuildpack::tar::decompress_tarball;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Metadata of the cached toolchain. A change to any field invalidates the layer.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub(crate) struct GoLayerMetadata {
    pub(crate) version: String,
    pub(crate) arch: String,
}

/// The installed toolchain.
pub(crate) struct GoToolchain {
    pub(crate) root: PathBuf,
    pub(crate) env: LayerEnv,
}

impl GoToolchain {
    pub(crate) fn go_binary(&self) -> PathBuf {
        self.root.join("bin").join("go")
    }
}

pub(crate) fn install_go(
    context: &BuildContext<GoBuildpack>,
    version: &str,
) -> libcnb::Result<GoToolchain, GoBuildpackError> {
    let metadata = GoLayerMetadata {
        version: version.to_string(),
        arch: context.target.arch.clone(),
    };

    let layer_ref = context.cached_layer(
        layer_name!("go"),
        CachedLayerDefinition {
            build: true,
            launch: false,
            invalid_metadata_action: &|_| InvalidMetadataAction::DeleteLayer,
            restored_layer_action: &|cached: &GoLayerMetadata, _| {
                if cached == &metadata {
                    RestoredLayerAction::KeepLayer
                } else {
                    RestoredLayerAction::DeleteLayer
                }
            },
        },
    )?;

    match layer_ref.state {
        LayerState::Restored { .. } => {
            log_info(format!("Using cached Go {version}"));
        }
        LayerState::Empty { .. } => {
            let url = download_url(
                &context.buildpack_descriptor.metadata.download_url,
                version,
                &metadata.arch,
            );
            log_info(format!("Downloading Go {version} from {url}"));
            install_toolchain(&url, &layer_ref.path()).map_err(GoBuildpackError::GoLayer)?;
            layer_ref.write_metadata(metadata.clone())?;
        }
    }

    let env = toolchain_env(&layer_ref.path());
    layer_ref.write_env(&env)?;

    Ok(GoToolchain {
        root: layer_ref.path(),
        env,
    })
}

fn download_url(template: &str, version: &str, arch: &str) -> String {
    template
        .replace("{version}", version)
        .replace("{arch}", arch)
}

fn install_toolchain(url: &str, layer_dir: &Path) -> Result<(), GoLayerError> {
    let tarball = tempfile::NamedTempFile::new().map_err(GoLayerError::Extract)?;
    download_file(url, tarball.path()).map_err(GoLayerError::Download)?;

    // The archive contains a single `go` directory that becomes the layer root.
    decompress_tarball(&mut tarball.reopen().map_err(GoLayerError::Extract)?, layer_dir)
        .map_err(GoLayerError::Extract)?;
    let archive_root = layer_dir.join("go");
    move_directory_contents(&archive_root, layer_dir).map_err(GoLayerError::Extract)?;
    fs::remove_dir(&archive_root).map_err(GoLayerError::Extract)
}

fn toolchain_env(go_root: &Path) -> LayerEnv {
    LayerEnv::new()
        .chainable_insert(Scope::Build, ModificationBehavior::Override, "GOROOT", go_root)
        .chainable_insert(
            Scope::Build,
            ModificationBehavior::Prepend,
            "PATH",
            go_root.join("bin"),
        )
        .chainable_insert(Scope::Build, ModificationBehavior::Delimiter, "PATH", ":")
}

#[derive(Debug)]
pub(crate) enum GoLayerError {
    Download(DownloadError),
    Extract(io::Error),
}

impl GoLayerError {
    /// Failed HTTP requests usually mean the requested version doesn't exist.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            GoLayerError::Download(DownloadError::HttpError(_)) => ErrorKind::User,
            GoLayerError::Download(_) | GoLayerError::Extract(_) => ErrorKind::Internal,
        }
    }
}
