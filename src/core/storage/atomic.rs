//! Write-to-temp-then-rename file replacement.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use uuid::Uuid;

/// Suffix of in-flight temporary files. Readers and pruning ignore them.
pub(super) const TMP_SUFFIX: &str = ".tmp";

/// Atomically replace `path` with `contents`.
///
/// The data is written and fsynced into a uniquely named sibling first, then
/// renamed over the target, so readers see either the old file or the new one.
pub(super) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent"))?;
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid file name"))?;
    let tmp = dir.join(format!(".{}.{}{}", file_name, Uuid::new_v4().simple(), TMP_SUFFIX));

    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    // Persist the rename itself. Not supported on every platform.
    #[cfg(unix)]
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
    Ok(())
}
