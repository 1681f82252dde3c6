use crate::{GoBuildpack, GoBuildpackError};
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::generic::GenericMetadata;
use libcnb::layer::{
    CachedLayerDefinition, InvalidMetadataAction, RestoredLayerAction, UncachedLayerDefinition,
};
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use libherokubuildpack::log::log_info;
use std::path::{Path, PathBuf};

/// The Go workspace, holding the module cache.
pub(crate) struct Gopath {
    pub(crate) path: PathBuf,
    pub(crate) env: LayerEnv,
}

/// Creates the `GOPATH` layer.
///
/// The module cache is only worth keeping between builds for module-aware builds, i.e. when the
/// app has a module descriptor and is built with Go 1.13 or newer. Otherwise the layer starts
/// out empty on every build.
pub(crate) fn create_gopath(
    context: &BuildContext<GoBuildpack>,
    cache: bool,
) -> libcnb::Result<Gopath, GoBuildpackError> {
    let path = if cache {
        context
            .cached_layer(
                layer_name!("gopath"),
                CachedLayerDefinition {
                    build: true,
                    launch: false,
                    invalid_metadata_action: &|_| InvalidMetadataAction::DeleteLayer,
                    restored_layer_action: &|_: &GenericMetadata, _| {
                        RestoredLayerAction::KeepLayer
                    },
                },
            )
            .and_then(|layer_ref| {
                layer_ref.write_env(gopath_env(&layer_ref.path()))?;
                Ok(layer_ref.path())
            })?
    } else {
        log_info("Module cache is disabled for this build");
        context
            .uncached_layer(
                layer_name!("gopath"),
                UncachedLayerDefinition {
                    build: true,
                    launch: false,
                },
            )
            .and_then(|layer_ref| {
                layer_ref.write_env(gopath_env(&layer_ref.path()))?;
                Ok(layer_ref.path())
            })?
    };

    Ok(Gopath {
        env: gopath_env(&path),
        path,
    })
}

/// Builds of later buildpacks must not fetch modules, everything has been downloaded into
/// `GOPATH` by then.
fn gopath_env(path: &Path) -> LayerEnv {
    LayerEnv::new()
        .chainable_insert(Scope::Build, ModificationBehavior::Override, "GOPATH", path)
        .chainable_insert(Scope::Build, ModificationBehavior::Override, "GO111MODULE", "on")
        .chainable_insert(Scope::Build, ModificationBehavior::Override, "GOPROXY", "off")
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcnb::Env;

    #[test]
    fn gopath_env_disables_the_module_proxy() {
        let env =
            gopath_env(Path::new("/layers/buildpacks_go/gopath")).apply_to_empty(Scope::Build);

        assert_eq!(env.get("GOPATH").unwrap(), "/layers/buildpacks_go/gopath");
        assert_eq!(env.get("GO111MODULE").unwrap(), "on");
        assert_eq!(env.get("GOPROXY").unwrap(), "off");
    }

    #[test]
    fn gopath_env_is_build_only() {
        let env: Env = gopath_env(Path::new("/layers/buildpacks_go/gopath"))
            .apply_to_empty(Scope::Launch);

        assert!(env.get("GOPATH").is_none());
    }
}
