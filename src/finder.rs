// Folder scan: picks the video files a batch run will upload.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::error::Result;

/// Recursively collect every `.mp4` file (extension matched
/// case-insensitively) under `dir`, sorted by path so batches run in a
/// stable order.
///
/// Entries that cannot be read (dangling symlinks, loops, unreadable
/// subdirectories) are logged and skipped. A root that does not exist
/// yields no files; any other failure to read the root is an error.
pub fn find_mp4_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) {
                    warn!("'{}' does not exist", dir.display());
                    return Ok(Vec::new());
                }
                return Err(e.into());
            }
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let is_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
        if is_mp4 {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
