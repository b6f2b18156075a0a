// mizu_core/src/repo.rs
use crate::domain::PageEntry;
use crate::error::Result;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct OpenParams {
    pub archive_path: PathBuf,
}

/// Read access to the pages of one archive.
pub trait PageRepo: Send + Sync {
    fn archive_path(&self) -> &Path;

    /// Image entries in natural order.
    fn list_pages(&self) -> Result<Vec<PageEntry>>;

    /// Read one entry into `buf` (cleared first), refusing entries above `limit` bytes.
    fn read_entry(&self, name: &str, buf: &mut Vec<u8>, limit: u64) -> Result<usize>;

    /// Write one entry to `dest` atomically.
    fn extract_to(&self, name: &str, dest: &Path) -> Result<u64>;
}
