use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const UTF8_BOM: char = '\u{FEFF}';

/// Read a text file such as a lockfile or import map.
///
/// Invalid UTF-8 becomes U+FFFD and a leading byte-order mark is dropped.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let text = match String::from_utf8(fs::read(path)?) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };

    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Replace `path` with `bytes` in one step.
///
/// The content is staged in a temp file next to the target and persisted
/// over it, so readers see either the old or the new import map. A failed
/// write leaves no staging file behind.
///
/// # Errors
/// Returns an error if staging or persisting fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
