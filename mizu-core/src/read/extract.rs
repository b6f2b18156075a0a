use crate::error::{MizuError, Result};
use crate::read::index::image_entries;
use crate::read::opened::Opened;
use crate::util::sanitize::sanitize_component;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stream `entry` to `dest`, going through a temp file in the same directory
/// and renaming it into place. Readers of `dest` never observe a partial file.
pub fn extract_entry_to(opened: &Opened, entry: &str, dest: &Path) -> Result<u64> {
    let dir = dest
        .parent()
        .ok_or_else(|| MizuError::Format(format!("no parent dir: {}", dest.display())))?;
    fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    let n = {
        let mut w = BufWriter::new(tmp.as_file());
        let n = opened.copy_entry(entry, &mut w)?;
        w.flush()?;
        n
    };
    if n == 0 {
        // tmp is removed on drop
        return Err(MizuError::Format(format!("empty entry: {entry}")));
    }
    tmp.persist(dest).map_err(|e| MizuError::Io(e.error))?;
    Ok(n)
}

/// Extract every image entry of `archive` into `dest`, flattening names.
pub fn extract_pages(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let opened = Opened::open(archive)?;
    let pages = image_entries(&opened)?;
    fs::create_dir_all(dest)?;

    let mut out = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        // index prefix keeps natural order visible in a plain directory listing
        let p = dest.join(format!("{:04}-{}", i + 1, sanitize_component(&page.name)));
        extract_entry_to(&opened, &page.name, &p)?;
        out.push(p);
    }
    Ok(out)
}
