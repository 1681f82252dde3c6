use crate::{RubyBundleBuildpack, RubyBundleBuildpackError};
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::layer::{
    CachedLayerDefinition, InvalidMetadataAction, LayerState, RestoredLayerAction,
};
use libherokubuildpack::log::log_info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Installed gems are only valid for the Ruby they were built against and the exact lockfile
/// they were resolved from.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub(crate) struct GemsLayerMetadata {
    pub(crate) ruby_version: Option<String>,
    pub(crate) lockfile_checksum: Option<String>,
}

/// Creates the layer `bundle install` installs into and returns its path.
pub(crate) fn create_gems_layer(
    context: &BuildContext<RubyBundleBuildpack>,
    metadata: &GemsLayerMetadata,
) -> libcnb::Result<PathBuf, RubyBundleBuildpackError> {
    let layer_ref = context.cached_layer(
        layer_name!("gems"),
        CachedLayerDefinition {
            build: true,
            launch: true,
            invalid_metadata_action: &|_| InvalidMetadataAction::DeleteLayer,
            restored_layer_action: &|cached: &GemsLayerMetadata, _| {
                if cached == metadata {
                    RestoredLayerAction::KeepLayer
                } else {
                    RestoredLayerAction::DeleteLayer
                }
            },
        },
    )?;

    match layer_ref.state {
        LayerState::Restored { .. } => log_info("Reusing gems from the previous build"),
        LayerState::Empty { .. } => {
            log_info("Installing gems into an empty cache");
            layer_ref.write_metadata(metadata.clone())?;
        }
    }

    Ok(layer_ref.path())
}
