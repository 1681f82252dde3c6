use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Replaces the contents of the file at `path` without ever exposing partially written contents.
///
/// The contents go to a temporary file in the same directory which is then renamed over `path`.
/// Permissions of an existing file are kept. On failure the temporary file is removed and `path`
/// is left as it was.
pub(crate) fn write_atomically(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(directory)?;
    temp_file.write_all(contents.as_ref())?;
    temp_file.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp_file.path(), metadata.permissions())?;
    }

    temp_file.persist(path).map(|_| ()).map_err(|error| error.error)
}
