//! Sources of raw version text.
//!
//! Code that needs a version string, like the output of `go version` or the contents of a
//! `.ruby-version` file, takes a [`VersionSource`] instead of reading it directly. Tests pass a
//! [`StaticVersionSource`].

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Provides raw, unparsed version text.
pub trait VersionSource {
    /// Returns `Ok(None)` if the source doesn't exist, e.g. a missing file or executable.
    fn read_version(&self) -> io::Result<Option<String>>;
}

/// Reads the complete contents of a file.
#[derive(Debug, Clone)]
pub struct FileVersionSource {
    path: PathBuf,
}

impl FileVersionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VersionSource for FileVersionSource {
    fn read_version(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Runs a program and captures its standard output.
///
/// A program that can't be found yields `None`. A program that exits unsuccessfully is an error.
#[derive(Debug, Clone)]
pub struct CommandVersionSource {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandVersionSource {
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl VersionSource for CommandVersionSource {
    fn read_version(&self) -> io::Result<Option<String>> {
        let output = match Command::new(&self.program).args(&self.args).output() {
            Ok(output) => output,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error),
        };

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            Err(io::Error::other(format!(
                "{} exited with {}: {}",
                self.program.to_string_lossy(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// A fixed, in-memory version text.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StaticVersionSource(pub Option<String>);

impl StaticVersionSource {
    pub fn new(version: impl Into<String>) -> Self {
        Self(Some(version.into()))
    }

    #[must_use]
    pub fn absent() -> Self {
        Self(None)
    }
}

impl VersionSource for StaticVersionSource {
    fn read_version(&self) -> io::Result<Option<String>> {
        Ok(self.0.clone())
    }
}
