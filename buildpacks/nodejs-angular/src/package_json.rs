use buildpack_commons::ErrorKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub(crate) const ANGULAR_CORE: &str = "@angular/core";

/// The parts of `package.json` this buildpack looks at.
#[derive(Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PackageJson {
    #[serde(default)]
    pub(crate) version: Option<String>,
    #[serde(default)]
    pub(crate) dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) scripts: BTreeMap<String, String>,
}

impl PackageJson {
    pub(crate) fn read(path: &Path) -> Result<Self, PackageJsonError> {
        read_json(path)
    }

    /// The version requirement for a package, preferring `devDependencies`.
    pub(crate) fn dependency_spec(&self, name: &str) -> Option<&str> {
        self.dev_dependencies
            .get(name)
            .or_else(|| self.dependencies.get(name))
            .map(String::as_str)
            .filter(|spec| !spec.is_empty())
    }

    pub(crate) fn build_script(&self) -> Option<&str> {
        self.scripts.get("build").map(String::as_str)
    }
}

/// `package-lock.json`, lockfile version 2 or newer.
#[derive(Deserialize, Debug, Default, Clone, Eq, PartialEq)]
pub(crate) struct PackageLock {
    #[serde(default)]
    pub(crate) packages: BTreeMap<String, LockedPackage>,
}

#[derive(Deserialize, Debug, Default, Clone, Eq, PartialEq)]
pub(crate) struct LockedPackage {
    #[serde(default)]
    pub(crate) version: Option<String>,
}

impl PackageLock {
    pub(crate) fn read(path: &Path) -> Result<Self, PackageJsonError> {
        read_json(path)
    }

    /// The exact installed version of a top-level package.
    pub(crate) fn installed_version(&self, name: &str) -> Option<&str> {
        self.packages
            .get(&format!("node_modules/{name}"))
            .and_then(|package| package.version.as_deref())
    }
}

/// `package.json` of an app together with the location of its lockfile, if any.
#[derive(Debug, Clone)]
pub(crate) struct NodeDependencies {
    pub(crate) package_json: PackageJson,
    pub(crate) lockfile: Option<PathBuf>,
}

impl NodeDependencies {
    pub(crate) fn read(app_dir: &Path) -> Result<Self, PackageJsonError> {
        let lockfile = app_dir.join("package-lock.json");

        Ok(Self {
            package_json: PackageJson::read(&app_dir.join("package.json"))?,
            lockfile: lockfile.is_file().then_some(lockfile),
        })
    }

    /// The installed version of a package according to the lockfile.
    pub(crate) fn locked_version(&self, name: &str) -> Result<Option<String>, PackageJsonError> {
        let Some(lockfile) = &self.lockfile else {
            return Ok(None);
        };

        Ok(PackageLock::read(lockfile)?
            .installed_version(name)
            .map(String::from))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PackageJsonError> {
    let contents = fs::read_to_string(path).map_err(|error| PackageJsonError::Io {
        path: path.to_path_buf(),
        source: error,
    })?;

    serde_json::from_str(&contents).map_err(|error| PackageJsonError::Json {
        path: path.to_path_buf(),
        source: error,
    })
}

#[derive(Debug)]
pub(crate) enum PackageJsonError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl PackageJsonError {
    /// Invalid JSON has to be fixed in the app, failing to read a file is an environment problem.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            PackageJsonError::Io { .. } => ErrorKind::Internal,
            PackageJsonError::Json { .. } => ErrorKind::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::tempdir;

    #[test]
    fn reads_package_json() {
        let package_json: PackageJson = serde_json::from_str(indoc! {r#"
            {
              "name": "angular-app",
              "scripts": { "build": "ng build", "start": "node server.mjs" },
              "dependencies": { "@angular/core": "^18.0.0", "rxjs": "~7.8.0" },
              "devDependencies": { "@angular/cli": "^18.0.1" }
            }
        "#})
        .unwrap();

        assert_eq!(package_json.build_script(), Some("ng build"));
        assert_eq!(package_json.dependency_spec(ANGULAR_CORE), Some("^18.0.0"));
        assert_eq!(package_json.dependency_spec("@angular/cli"), Some("^18.0.1"));
        assert_eq!(package_json.dependency_spec("react"), None);
        assert_eq!(package_json.version, None);
    }

    #[test]
    fn dev_dependencies_take_precedence() {
        let package_json: PackageJson = serde_json::from_str(
            r#"{"dependencies": {"@angular/core": "17.0.0"}, "devDependencies": {"@angular/core": "17.3.0"}}"#,
        )
        .unwrap();

        assert_eq!(package_json.dependency_spec(ANGULAR_CORE), Some("17.3.0"));
    }

    #[test]
    fn locked_version_of_top_level_package() {
        let lock: PackageLock = serde_json::from_str(indoc! {r#"
            {
              "lockfileVersion": 3,
              "packages": {
                "": { "name": "angular-app" },
                "node_modules/@angular/core": { "version": "18.2.1" },
                "node_modules/other/node_modules/@angular/core": { "version": "16.0.0" }
              }
            }
        "#})
        .unwrap();

        assert_eq!(lock.installed_version(ANGULAR_CORE), Some("18.2.1"));
        assert_eq!(lock.installed_version("rxjs"), None);
    }

    #[test]
    fn node_dependencies_without_lockfile() {
        let app_dir = tempdir().unwrap();
        fs::write(app_dir.path().join("package.json"), "{}").unwrap();

        let deps = NodeDependencies::read(app_dir.path()).unwrap();
        assert_eq!(deps.lockfile, None);
        assert_eq!(deps.locked_version(ANGULAR_CORE).unwrap(), None);
    }

    #[test]
    fn malformed_package_json() {
        let app_dir = tempdir().unwrap();
        fs::write(app_dir.path().join("package.json"), "{ not json").unwrap();

        assert!(matches!(
            NodeDependencies::read(app_dir.path()),
            Err(PackageJsonError::Json { .. })
        ));
    }

    #[test]
    fn missing_package_json() {
        let app_dir = tempdir().unwrap();

        assert!(matches!(
            NodeDependencies::read(app_dir.path()),
            Err(PackageJsonError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound
        ));
    }

    #[test]
    fn only_invalid_json_is_a_user_error() {
        let app_dir = tempdir().unwrap();
        assert_eq!(
            NodeDependencies::read(app_dir.path()).unwrap_err().kind(),
            ErrorKind::Internal
        );

        fs::write(app_dir.path().join("package.json"), "{ not json").unwrap();
        assert_eq!(
            NodeDependencies::read(app_dir.path()).unwrap_err().kind(),
            ErrorKind::User
        );
    }
}
