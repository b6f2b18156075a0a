use crate::domain::PageEntry;
use crate::error::Result;
use crate::read::opened::Opened;
use crate::util::natural::natural_cmp;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz"];

fn has_extension(name: &str, allowed: &[&str]) -> bool {
    match Path::new(name).extension().and_then(|s| s.to_str()) {
        Some(ext) => allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn is_image_name(name: &str) -> bool {
    has_extension(name, IMAGE_EXTENSIONS)
}

pub fn is_archive_name(name: &str) -> bool {
    has_extension(name, ARCHIVE_EXTENSIONS)
}

/// Image entries of an open archive, in natural order of name.
pub fn image_entries(opened: &Opened) -> Result<Vec<PageEntry>> {
    let mut pages: Vec<PageEntry> = opened
        .raw_entries()?
        .into_iter()
        .filter(|e| !e.is_dir && is_image_name(&e.name))
        .map(|e| PageEntry {
            name: e.name,
            size: e.size,
        })
        .collect();
    pages.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    Ok(pages)
}

/// Open `archive` and list its pages. An archive without images gives an
/// empty list; one that cannot be opened gives `MizuError::Open`.
pub fn list_pages(archive: &Path) -> Result<Vec<PageEntry>> {
    let opened = Opened::open(archive)?;
    let pages = image_entries(&opened)?;
    tracing::debug!(archive = %archive.display(), pages = pages.len(), "indexed archive");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_allow_list_is_case_insensitive() {
        assert!(is_image_name("p1.JPG"));
        assert!(is_image_name("dir/p1.jpeg"));
        assert!(is_image_name("x.webp"));
        assert!(is_image_name("x.Gif"));
        assert!(!is_image_name("ComicInfo.xml"));
        assert!(!is_image_name("thumbs.db"));
        assert!(!is_image_name("png"));
        assert!(!is_image_name("scan.tiff"));
    }

    #[test]
    fn archive_names() {
        assert!(is_archive_name("One Piece 01.CBZ"));
        assert!(is_archive_name("a.zip"));
        assert!(!is_archive_name("a.cbr"));
    }
}
