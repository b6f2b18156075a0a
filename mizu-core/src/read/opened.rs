use crate::error::{MizuError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zip::ZipArchive;
use zip::result::ZipError;

#[derive(Clone, Debug)]
pub struct RawEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// An archive held open for repeated entry reads.
///
/// The zip reader needs `&mut` for every entry access, so it sits behind a
/// mutex; entry reads on one `Opened` are serialized.
pub struct Opened {
    pub path: PathBuf,
    zip: Mutex<ZipArchive<BufReader<File>>>,
}

impl Opened {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| MizuError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let zip = ZipArchive::new(BufReader::new(f)).map_err(|e| MizuError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(archive = %path.display(), entries = zip.len(), "opened archive");
        Ok(Self {
            path: path.to_path_buf(),
            zip: Mutex::new(zip),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ZipArchive<BufReader<File>>>> {
        self.zip
            .lock()
            .map_err(|e| MizuError::Format(format!("archive lock poisoned: {e}")))
    }

    /// Every entry in central-directory order, directories included.
    pub fn raw_entries(&self) -> Result<Vec<RawEntry>> {
        let mut zip = self.lock()?;
        let mut out = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let zf = zip.by_index(i)?;
            out.push(RawEntry {
                name: zf.name().to_string(),
                size: zf.size(),
                is_dir: zf.is_dir(),
            });
        }
        Ok(out)
    }

    /// Stream one entry into `out`, returning the number of bytes written.
    pub fn copy_entry(&self, name: &str, out: &mut dyn Write) -> Result<u64> {
        let mut zip = self.lock()?;
        let mut zf = zip.by_name(name).map_err(|e| not_found(name, e))?;
        if zf.is_dir() {
            return Err(MizuError::NotFound(format!("{name} is a directory")));
        }
        Ok(std::io::copy(&mut zf, out)?)
    }

    /// Read at most `limit` bytes of one entry into `buf` (cleared first).
    pub fn read_entry_into(&self, name: &str, buf: &mut Vec<u8>, limit: u64) -> Result<usize> {
        buf.clear();
        let mut zip = self.lock()?;
        let zf = zip.by_name(name).map_err(|e| not_found(name, e))?;
        if zf.size() > limit {
            return Err(MizuError::Format(format!(
                "{name}: {} bytes exceeds limit {limit}",
                zf.size()
            )));
        }
        let n = zf.take(limit).read_to_end(buf)?;
        Ok(n)
    }
}

fn not_found(name: &str, e: ZipError) -> MizuError {
    match e {
        ZipError::FileNotFound => MizuError::NotFound(format!("no such entry: {name}")),
        other => MizuError::Zip(other),
    }
}
