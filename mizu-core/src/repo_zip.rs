use std::path::Path;
use std::sync::Arc;

use crate::domain::PageEntry;
use crate::error::Result;
use crate::read::extract::extract_entry_to;
use crate::read::index::image_entries;
use crate::read::opened::Opened;
use crate::repo::{OpenParams, PageRepo};

pub struct ZipPageRepo {
    opened: Arc<Opened>,
}

impl ZipPageRepo {
    pub fn new(params: OpenParams) -> Result<Self> {
        let opened = Opened::open(&params.archive_path)?;
        Ok(Self {
            opened: Arc::new(opened),
        })
    }
}

impl PageRepo for ZipPageRepo {
    fn archive_path(&self) -> &Path {
        &self.opened.path
    }

    fn list_pages(&self) -> Result<Vec<PageEntry>> {
        image_entries(&self.opened)
    }

    fn read_entry(&self, name: &str, buf: &mut Vec<u8>, limit: u64) -> Result<usize> {
        self.opened.read_entry_into(name, buf, limit)
    }

    fn extract_to(&self, name: &str, dest: &Path) -> Result<u64> {
        extract_entry_to(&self.opened, name, dest)
    }
}
