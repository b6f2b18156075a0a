//! Page aspect ratios from image headers.
//!
//! Each entry is streamed into one reused scratch buffer and only the header
//! is decoded, so no pixel buffer is ever allocated. Entries that fail are
//! logged and left out of the result.

use std::collections::HashMap;
use std::io::Cursor;

use image::ImageReader;

use crate::domain::PageEntry;
use crate::error::{MizuError, Result};
use crate::repo::PageRepo;

#[derive(Clone, Debug, PartialEq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

/// Decode width/height from the leading bytes of an encoded image.
pub fn probe_dimensions(bytes: &[u8]) -> Result<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Dimensions { width, height })
}

pub struct ProbeOptions {
    pub max_entry_bytes: u64,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            max_entry_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Aspect ratio per entry name. `progress` receives `processed / total` after
/// every entry; wrap it in a `ThrottledProgress` before handing it to a UI.
pub fn probe_aspect_ratios(
    repo: &dyn PageRepo,
    entries: &[PageEntry],
    opts: &ProbeOptions,
    progress: &mut dyn FnMut(f32),
) -> HashMap<String, f32> {
    let total = entries.len();
    let mut out = HashMap::with_capacity(total);
    let mut scratch = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        match probe_one(repo, entry, opts, &mut scratch) {
            Ok(ratio) => {
                out.insert(entry.name.clone(), ratio);
            }
            Err(e) => {
                tracing::warn!(
                    archive = %repo.archive_path().display(),
                    entry = %entry.name,
                    error = %e,
                    "skipping page"
                );
            }
        }
        scratch.clear();
        progress((i + 1) as f32 / total as f32);
    }

    // drop the largest entry's allocation now rather than with the caller
    scratch.shrink_to_fit();
    tracing::debug!(
        archive = %repo.archive_path().display(),
        probed = out.len(),
        total,
        "probe finished"
    );
    out
}

fn probe_one(
    repo: &dyn PageRepo,
    entry: &PageEntry,
    opts: &ProbeOptions,
    scratch: &mut Vec<u8>,
) -> Result<f32> {
    if entry.size > opts.max_entry_bytes {
        return Err(MizuError::Format(format!(
            "{} bytes exceeds limit {}",
            entry.size, opts.max_entry_bytes
        )));
    }
    repo.read_entry(&entry.name, scratch, opts.max_entry_bytes)?;
    let dims = probe_dimensions(scratch)?;
    dims.aspect_ratio()
        .ok_or_else(|| MizuError::Format(format!("zero height: {}x{}", dims.width, dims.height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat};
    use std::path::{Path, PathBuf};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        GrayImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    struct MemRepo {
        path: PathBuf,
        entries: Vec<(String, Vec<u8>)>,
    }

    impl PageRepo for MemRepo {
        fn archive_path(&self) -> &Path {
            &self.path
        }
        fn list_pages(&self) -> Result<Vec<PageEntry>> {
            Ok(self
                .entries
                .iter()
                .map(|(n, b)| PageEntry {
                    name: n.clone(),
                    size: b.len() as u64,
                })
                .collect())
        }
        fn read_entry(&self, name: &str, buf: &mut Vec<u8>, _limit: u64) -> Result<usize> {
            let (_, bytes) = self
                .entries
                .iter()
                .find(|(n, _)| n == name)
                .ok_or_else(|| MizuError::NotFound(name.to_string()))?;
            buf.clear();
            buf.extend_from_slice(bytes);
            Ok(bytes.len())
        }
        fn extract_to(&self, _name: &str, _dest: &Path) -> Result<u64> {
            unreachable!("prober never extracts")
        }
    }

    #[test]
    fn header_probe_gives_ratio() {
        let dims = probe_dimensions(&png(900, 1350)).unwrap();
        assert_eq!(dims, Dimensions { width: 900, height: 1350 });
        let r = dims.aspect_ratio().unwrap();
        assert!((r - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn bad_entries_are_skipped_not_fatal() {
        let repo = MemRepo {
            path: PathBuf::from("mem.cbz"),
            entries: vec![
                ("01.png".into(), png(800, 1200)),
                ("02.png".into(), b"definitely not an image".to_vec()),
                ("03.png".into(), png(1600, 1200)),
            ],
        };
        let entries = repo.list_pages().unwrap();
        let mut seen = Vec::new();
        let ratios = probe_aspect_ratios(&repo, &entries, &ProbeOptions::default(), &mut |p| {
            seen.push(p)
        });

        assert_eq!(ratios.len(), 2);
        assert!(!ratios.contains_key("02.png"));
        assert!((ratios["03.png"] - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn oversized_entries_are_skipped() {
        let repo = MemRepo {
            path: PathBuf::from("mem.cbz"),
            entries: vec![("big.png".into(), png(10, 10))],
        };
        let entries = repo.list_pages().unwrap();
        let opts = ProbeOptions { max_entry_bytes: 4 };
        let ratios = probe_aspect_ratios(&repo, &entries, &opts, &mut |_| {});
        assert!(ratios.is_empty());
    }

    #[test]
    fn empty_entry_list_reports_nothing() {
        let repo = MemRepo {
            path: PathBuf::from("mem.cbz"),
            entries: vec![],
        };
        let mut calls = 0;
        let ratios =
            probe_aspect_ratios(&repo, &[], &ProbeOptions::default(), &mut |_| calls += 1);
        assert!(ratios.is_empty());
        assert_eq!(calls, 0);
    }
}
