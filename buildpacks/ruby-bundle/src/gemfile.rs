use buildpack_commons::directive::read_line_after;
use buildpack_commons::manifest::CompatibilityPatch;
use buildpack_commons::{ErrorKind, SemanticVersion, VersionError};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default gems that Ruby 3.4 no longer ships as part of the standard library.
const BUNDLED_GEMS: &[&str] = &[
    "abbrev",
    "base64",
    "bigdecimal",
    "csv",
    "drb",
    "English",
    "fileutils",
    "find",
    "getoptlong",
    "logger",
    "mutex_m",
    "nkf",
    "observer",
    "open-uri",
    "optparse",
    "pp",
    "prettyprint",
    "resolv",
    "resolv-replace",
    "rinda",
    "set",
    "shellwords",
    "tempfile",
    "time",
    "tmpdir",
    "tsort",
    "un",
    "weakref",
];

const BUNDLED_GEMS_MARKER: &str = "# Added by buildpacks for Ruby 3.4+ compatibility";

/// Gem manifest and lockfile of an app.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct GemfilePaths {
    pub(crate) manifest: PathBuf,
    pub(crate) lockfile: PathBuf,
}

impl GemfilePaths {
    /// `gems.rb` and `gems.locked` take precedence over `Gemfile` and `Gemfile.lock`.
    pub(crate) fn for_app(app_dir: &Path) -> Self {
        if app_dir.join("gems.rb").is_file() {
            Self {
                manifest: app_dir.join("gems.rb"),
                lockfile: app_dir.join("gems.locked"),
            }
        } else {
            Self {
                manifest: app_dir.join("Gemfile"),
                lockfile: app_dir.join("Gemfile.lock"),
            }
        }
    }

    pub(crate) fn has_lockfile(&self) -> bool {
        self.lockfile.is_file()
    }
}

pub(crate) fn bundled_gems_patch(threshold: SemanticVersion) -> CompatibilityPatch<'static> {
    CompatibilityPatch {
        threshold,
        marker: BUNDLED_GEMS_MARKER,
        directive: "gem",
        entries: BUNDLED_GEMS,
    }
}

/// Reads the Ruby version from the `RUBY VERSION` section of a lockfile.
///
/// The patch level is dropped, `ruby 2.6.7p450` yields `2.6.7`. A lockfile without the section
/// has no Ruby version.
pub(crate) fn parse_ruby_version(lockfile: &Path) -> Result<Option<String>, LockfileError> {
    let Some(line) = read_line_after(lockfile, "RUBY VERSION").map_err(LockfileError::Read)? else {
        return Ok(None);
    };
    if line.trim().is_empty() {
        return Ok(None);
    }

    let version = ruby_version_regex()
        .captures(&line)
        .and_then(|captures| captures.get(1))
        .map(|version| version.as_str().to_string());

    match version {
        Some(version) => Ok(Some(version)),
        None => Err(LockfileError::Version(VersionError::MalformedVersion(line))),
    }
}

/// Reads the Bundler version from the `BUNDLED WITH` section of a lockfile, rendered as
/// `major.minor.patch`.
pub(crate) fn parse_bundler_version(lockfile: &Path) -> Result<Option<String>, LockfileError> {
    let Some(line) = read_line_after(lockfile, "BUNDLED WITH").map_err(LockfileError::Read)? else {
        return Ok(None);
    };
    if line.trim().is_empty() {
        return Ok(None);
    }

    SemanticVersion::parse(line.trim())
        .map(|version| Some(version.to_canonical()))
        .map_err(LockfileError::Version)
}

fn ruby_version_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();

    REGEX.get_or_init(|| {
        Regex::new(r"^\s*ruby\s+([^p^\s]+)(p\d+)?\s*$")
            .expect("ruby version regex should be valid")
    })
}

#[derive(Debug)]
pub(crate) enum LockfileError {
    Read(io::Error),
    Version(VersionError),
}

impl LockfileError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            LockfileError::Read(_) => ErrorKind::Internal,
            LockfileError::Version(version_error) => version_error.kind(),
        }
    }
}
