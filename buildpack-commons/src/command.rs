use crate::error::ErrorKind;
use libherokubuildpack::command::CommandExt;
use std::io;
use std::process::{Command, ExitStatus, Output};

/// Runs the command, streams its output to the build log and fails on a non-zero exit status.
///
/// The captured output is returned as well, so callers can inspect it after the fact.
pub fn run_command_and_stream_output(
    command: &mut Command,
) -> Result<Output, StreamedCommandError> {
    let output = command
        .output_and_write_streams(io::stdout(), io::stderr())
        .map_err(|source| StreamedCommandError::Io {
            command: command_to_string(command),
            source,
        })?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(StreamedCommandError::NonZeroExitStatus {
            command: command_to_string(command),
            status: output.status,
        })
    }
}

/// Renders the program and its arguments the way they'd be typed into a shell, without quoting.
#[must_use]
pub fn command_to_string(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(thiserror::Error, Debug)]
pub enum StreamedCommandError {
    #[error("Couldn't run `{command}`: {source}")]
    Io { command: String, source: io::Error },

    #[error("`{command}` failed ({status})")]
    NonZeroExitStatus { command: String, status: ExitStatus },
}

impl StreamedCommandError {
    /// A command that ran and failed usually did so because of the application (a broken
    /// manifest, a compile error). A command that couldn't be started points at the build image.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamedCommandError::Io { .. } => ErrorKind::Internal,
            StreamedCommandError::NonZeroExitStatus { .. } => ErrorKind::User,
        }
    }
}
