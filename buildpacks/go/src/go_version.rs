use buildpack_commons::constraint::VersionConstraint;
use buildpack_commons::directive::find_directive;
use buildpack_commons::source::{
    CommandVersionSource, FileVersionSource, StaticVersionSource, VersionSource,
};
use buildpack_commons::{ErrorKind, SemanticVersion};
use std::io;
use std::path::Path;

/// Go releases from this version on pick up `vendor/` automatically when `go.mod` declares them.
fn auto_vendor_version() -> SemanticVersion {
    SemanticVersion::new(1, 14, 0)
}

/// The Go versions relevant to a build: the version of the installed toolchain and the versions
/// declared by the application in `go.mod` and `go.work`.
pub(crate) struct GoVersions {
    toolchain: Box<dyn VersionSource>,
    go_mod: Box<dyn VersionSource>,
    go_work: Box<dyn VersionSource>,
}

impl GoVersions {
    pub(crate) fn new(
        toolchain: impl VersionSource + 'static,
        go_mod: impl VersionSource + 'static,
        go_work: impl VersionSource + 'static,
    ) -> Self {
        Self {
            toolchain: Box::new(toolchain),
            go_mod: Box::new(go_mod),
            go_work: Box::new(go_work),
        }
    }

    /// Reads the descriptors from the app directory and queries the given `go` binary.
    pub(crate) fn for_app(app_dir: &Path, go_binary: &Path) -> Self {
        Self::new(
            CommandVersionSource::new(go_binary, ["version"]),
            FileVersionSource::new(app_dir.join("go.mod")),
            FileVersionSource::new(app_dir.join("go.work")),
        )
    }

    /// Reads the descriptors only, for checks that happen before a toolchain is installed.
    pub(crate) fn without_toolchain(app_dir: &Path) -> Self {
        Self::new(
            StaticVersionSource::absent(),
            FileVersionSource::new(app_dir.join("go.mod")),
            FileVersionSource::new(app_dir.join("go.work")),
        )
    }

    pub(crate) fn go_mod_version(&self) -> Result<Option<SemanticVersion>, GoVersionError> {
        declared_version(self.go_mod.as_ref())
    }

    pub(crate) fn go_work_version(&self) -> Result<Option<SemanticVersion>, GoVersionError> {
        declared_version(self.go_work.as_ref())
    }

    /// The version the application declares, `go.work` taking precedence over `go.mod`.
    pub(crate) fn source_version(&self) -> Result<Option<SemanticVersion>, GoVersionError> {
        match self.go_work_version()? {
            Some(version) => Ok(Some(version)),
            None => self.go_mod_version(),
        }
    }

    /// The version of the installed toolchain, without any pre-release tag.
    pub(crate) fn installed_version(&self) -> Result<SemanticVersion, GoVersionError> {
        let output = self
            .toolchain
            .read_version()
            .map_err(GoVersionError::ReadToolchainVersion)?
            .ok_or(GoVersionError::ToolchainNotFound)?;

        parse_go_version_output(&output)
            .ok_or(GoVersionError::UnexpectedToolchainOutput(output))
    }

    /// Whether `go build` picks up a vendor directory without `-mod=vendor`.
    pub(crate) fn supports_auto_vendor(&self) -> Result<bool, GoVersionError> {
        let Some(source_version) = self.source_version()? else {
            return Ok(false);
        };

        Ok(source_version >= auto_vendor_version()
            && self.installed_version()? >= auto_vendor_version())
    }

    /// Whether both the installed toolchain and the declared source version satisfy the
    /// constraint. Without a declared version this is always `false`.
    pub(crate) fn version_matches(
        &self,
        constraint: &VersionConstraint,
    ) -> Result<bool, GoVersionError> {
        let Some(source_version) = self.source_version()? else {
            return Ok(false);
        };

        Ok(constraint.satisfied_by(&source_version)
            && constraint.satisfied_by(&self.installed_version()?))
    }
}

fn declared_version(source: &dyn VersionSource) -> Result<Option<SemanticVersion>, GoVersionError> {
    let Some(contents) = source
        .read_version()
        .map_err(GoVersionError::ReadDescriptor)?
    else {
        return Ok(None);
    };

    Ok(find_directive(&contents, "go")
        .and_then(|literal| SemanticVersion::parse(literal).ok())
        // `go 1` doesn't say anything useful about the language version.
        .filter(|version| version.component_count() > 1))
}

/// Parses output such as `go version go1.15rc1 linux/amd64`.
fn parse_go_version_output(output: &str) -> Option<SemanticVersion> {
    output
        .split_whitespace()
        .nth(2)
        .and_then(|word| word.strip_prefix("go"))
        .and_then(|version| SemanticVersion::parse(version).ok())
        .map(|version| version.without_prerelease())
}

#[derive(Debug)]
pub(crate) enum GoVersionError {
    ReadDescriptor(io::Error),
    ReadToolchainVersion(io::Error),
    ToolchainNotFound,
    UnexpectedToolchainOutput(String),
}

impl GoVersionError {
    /// Descriptors are read as text, so none of these failures can be fixed in the app.
    #[allow(clippy::unused_self)]
    pub(crate) fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}
