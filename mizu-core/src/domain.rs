// mizu_core/src/domain.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One image entry of an archive, as listed by the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageEntry {
    pub name: String,
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRow {
    pub id: String,
    pub path: PathBuf,
    pub name: String,
    pub cover_path: Option<PathBuf>,
    pub total_pages: u32,
    pub size: u64,
    pub modified: i64,
    pub added_at: i64,
    /// Pages that survived measuring; `None` until the archive was measured.
    #[serde(default)]
    pub measured_pages: Option<u32>,
}

impl ArchiveRow {
    /// Page count a reader actually sees: measured pages once known, else
    /// every image entry.
    pub fn page_count(&self) -> u32 {
        self.measured_pages.unwrap_or(self.total_pages)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageRow {
    pub id: String,
    pub archive_id: String,
    pub name: String,
    pub aspect_ratio: f32,
    /// Position in natural order when the row was written.
    pub seq: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadProgress {
    pub archive_id: String,
    pub last_page: u32,
    pub total_pages: u32,
    pub updated_at: i64,
}

/// Stable archive id derived from the archive's path.
pub fn archive_id(path: &Path) -> String {
    let mut h = blake3::Hasher::new();
    h.update(path.to_string_lossy().as_bytes());
    hex::encode(&h.finalize().as_bytes()[..16])
}

/// Stable synthetic page id; the same archive/entry pair always yields the same id.
pub fn page_id(archive_id: &str, name: &str) -> String {
    let mut h = blake3::Hasher::new();
    h.update(archive_id.as_bytes());
    h.update(&[0]);
    h.update(name.as_bytes());
    hex::encode(&h.finalize().as_bytes()[..16])
}

impl PageRow {
    pub fn new(archive_id: &str, name: &str, aspect_ratio: f32, seq: u32) -> Self {
        Self {
            id: page_id(archive_id, name),
            archive_id: archive_id.to_string(),
            name: name.to_string(),
            aspect_ratio,
            seq,
        }
    }
}

pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
