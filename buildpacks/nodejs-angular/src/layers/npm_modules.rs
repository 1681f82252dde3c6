use crate::framework::adapter_version_requirement;
use crate::package_json::PackageJson;
use crate::{AngularBuildpack, AngularBuildpackError, FRAMEWORK_VERSION_ENV_VAR};
use buildpack_commons::command::run_command_and_stream_output;
use libcnb::build::BuildContext;
use libcnb::data::layer_name;
use libcnb::layer::{
    CachedLayerDefinition, InvalidMetadataAction, LayerState, RestoredLayerAction,
};
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use libherokubuildpack::log::log_info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Environment variable telling the Node.js build which scripts to run instead of `build`.
const NODE_RUN_SCRIPTS_ENV_VAR: &str = "NODE_RUN_SCRIPTS";

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub(crate) struct NpmModulesLayerMetadata {
    /// The npm package spec that was installed, e.g. `@apphosting/adapter-angular@~18.2.0`.
    pub(crate) package: String,
}

/// Installs the build adapter matching the Angular version into the `npm_modules` layer and
/// returns the installed adapter version.
pub(crate) fn install_adapter(
    context: &BuildContext<AngularBuildpack>,
    angular_version: &str,
) -> libcnb::Result<Option<String>, AngularBuildpackError> {
    let buildpack_metadata = &context.buildpack_descriptor.metadata;
    let layer_metadata = NpmModulesLayerMetadata {
        package: format!(
            "{}@{}",
            buildpack_metadata.adapter_package,
            adapter_version_requirement(angular_version)
        ),
    };

    let layer_ref = context.cached_layer(
        layer_name!("npm_modules"),
        CachedLayerDefinition {
            build: true,
            launch: false,
            invalid_metadata_action: &|_| InvalidMetadataAction::DeleteLayer,
            restored_layer_action: &|cached: &NpmModulesLayerMetadata, _| {
                if cached == &layer_metadata {
                    RestoredLayerAction::KeepLayer
                } else {
                    RestoredLayerAction::DeleteLayer
                }
            },
        },
    )?;

    match layer_ref.state {
        LayerState::Restored { .. } => {
            log_info(format!("Using cached {}", layer_metadata.package));
        }
        LayerState::Empty { .. } => {
            log_info(format!("Installing {}", layer_metadata.package));
            run_command_and_stream_output(
                Command::new("npm")
                    .args(["install", "--prefix"])
                    .arg(layer_ref.path())
                    .arg(&layer_metadata.package)
                    .current_dir(&context.app_dir),
            )
            .map_err(AngularBuildpackError::AdapterInstall)?;
            layer_ref.write_metadata(layer_metadata.clone())?;
        }
    }

    let adapter_package_json = layer_ref
        .path()
        .join("node_modules")
        .join(&buildpack_metadata.adapter_package)
        .join("package.json");
    let adapter_version = PackageJson::read(&adapter_package_json)
        .map_err(AngularBuildpackError::ReadAdapterVersion)?
        .version;

    layer_ref.write_env(adapter_env(
        &layer_ref.path(),
        angular_version,
        &buildpack_metadata.adapter_build_command,
    ))?;

    Ok(adapter_version)
}

fn adapter_env(layer_dir: &Path, angular_version: &str, adapter_build_command: &str) -> LayerEnv {
    LayerEnv::new()
        .chainable_insert(
            Scope::Build,
            ModificationBehavior::Override,
            FRAMEWORK_VERSION_ENV_VAR,
            angular_version,
        )
        .chainable_insert(
            Scope::Build,
            ModificationBehavior::Prepend,
            "PATH",
            layer_dir.join("node_modules").join(".bin"),
        )
        .chainable_insert(Scope::Build, ModificationBehavior::Delimiter, "PATH", ":")
        .chainable_insert(
            Scope::Build,
            ModificationBehavior::Override,
            NODE_RUN_SCRIPTS_ENV_VAR,
            adapter_build_command,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use libcnb::Env;

    #[test]
    fn adapter_env_configures_the_build() {
        let mut base_env = Env::new();
        base_env.insert("PATH", "/usr/bin");

        let env = adapter_env(
            Path::new("/layers/buildpacks_nodejs-angular/npm_modules"),
            "18.2.1",
            "apphosting-adapter-angular-build",
        )
        .apply(Scope::Build, &base_env);

        assert_eq!(env.get("FRAMEWORK_VERSION").unwrap(), "18.2.1");
        assert_eq!(
            env.get("NODE_RUN_SCRIPTS").unwrap(),
            "apphosting-adapter-angular-build"
        );
        assert_eq!(
            env.get("PATH").unwrap(),
            "/layers/buildpacks_nodejs-angular/npm_modules/node_modules/.bin:/usr/bin"
        );
    }

    #[test]
    fn adapter_env_is_build_only() {
        let env = adapter_env(Path::new("/layer"), "18.2.1", "build")
            .apply_to_empty(Scope::Launch);

        assert!(env.get("FRAMEWORK_VERSION").is_none());
    }
}
