#![doc = include_str!("../README.md")]

pub mod catalog;
#[cfg(feature = "command")]
pub mod command;
pub mod constraint;
pub mod directive;
pub mod error;
pub mod gate;
pub mod manifest;
#[cfg(feature = "metadata")]
pub mod metadata;
mod persist;
pub mod source;
pub mod version;

pub use error::{ErrorKind, VersionError};
pub use version::SemanticVersion;
