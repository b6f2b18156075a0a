use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::domain::{ArchiveRow, PageRow, ReadProgress};
use crate::error::{MizuError, Result};

pub const MAGIC: &[u8; 8] = b"MIZULOG\0";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = MAGIC.len() as u64 + 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum LogRecord {
    PutArchive(ArchiveRow),
    RemoveArchive { id: String },
    PutPages(Vec<PageRow>),
    SetProgress(ReadProgress),
}

/// Append-only record log: header, then `uvarint(len) || cbor(record)` frames.
pub struct Journal {
    f: File,
    pub path: PathBuf,
}

pub struct JournalIter<'a> {
    r: BufReader<&'a mut File>,
}

impl<'a> Iterator for JournalIter<'a> {
    type Item = Result<LogRecord>;
    fn next(&mut self) -> Option<Self::Item> {
        match read_next_record(&mut self.r) {
            Ok(Some(r)) => Some(Ok(r)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn read_next_record<R: Read>(r: &mut R) -> Result<Option<LogRecord>> {
    let len = match get_uvarint(r)? {
        Some(n) => n,
        None => return Ok(None),
    };

    // the length is untrusted; only what is actually on disk gets buffered
    let mut buf = Vec::new();
    let got = r.by_ref().take(len).read_to_end(&mut buf)?;
    if (got as u64) < len {
        // torn tail from an interrupted append, or a garbage length prefix
        return Ok(None);
    }

    let rec: LogRecord = ciborium::de::from_reader(&buf[..])
        .map_err(|e| MizuError::Format(format!("journal record decode: {e}")))?;
    Ok(Some(rec))
}

pub(crate) fn encode_record(out: &mut Vec<u8>, rec: &LogRecord) -> Result<()> {
    let mut plain = Vec::with_capacity(256);
    ciborium::ser::into_writer(rec, &mut plain)
        .map_err(|e| MizuError::Format(format!("journal record encode: {e}")))?;
    put_uvarint(out, plain.len() as u64);
    out.extend_from_slice(&plain);
    Ok(())
}

fn put_uvarint(out: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
}

fn get_uvarint<R: Read>(r: &mut R) -> Result<Option<u64>> {
    let mut x: u64 = 0;
    let mut s: u32 = 0;
    for _ in 0..10 {
        let mut b = [0u8; 1];
        match r.read(&mut b) {
            Ok(0) => return Ok(None),
            Ok(_) => {
                let byte = b[0];
                if byte < 0x80 {
                    x |= (byte as u64) << s;
                    return Ok(Some(x));
                }
                x |= ((byte & 0x7f) as u64) << s;
                s += 7;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(MizuError::Format("varint too long".into()))
}

pub(crate) fn write_header<W: Write>(w: &mut W) -> std::io::Result<()> {
    w.write_all(MAGIC)?;
    w.write_all(&[VERSION])
}

impl Journal {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if f.metadata()?.len() == 0 {
            write_header(&mut f)?;
            f.flush()?;
        } else {
            let mut magic = [0u8; 8];
            f.read_exact(&mut magic).map_err(|_| {
                MizuError::Format(format!("{}: truncated journal header", path.display()))
            })?;
            if &magic != MAGIC {
                return Err(MizuError::Format(format!(
                    "{}: not a mizu catalog",
                    path.display()
                )));
            }
            let mut ver = [0u8; 1];
            f.read_exact(&mut ver)?;
            if ver[0] != VERSION {
                return Err(MizuError::Format(format!(
                    "{}: unsupported catalog version {}",
                    path.display(),
                    ver[0]
                )));
            }
        }

        // appends always go to the end
        f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
        })
    }

    /// Append a single record. Partial tails are ignored on read.
    pub fn append(&mut self, rec: &LogRecord) -> Result<()> {
        let mut frame = Vec::with_capacity(256);
        encode_record(&mut frame, rec)?;
        self.f.seek(SeekFrom::End(0))?;
        self.f.write_all(&frame)?;
        self.f.flush()?;
        Ok(())
    }

    /// Read every complete record and cut off a torn tail so later appends
    /// start on a frame boundary.
    pub fn replay(&mut self) -> Result<Vec<LogRecord>> {
        self.f.seek(SeekFrom::Start(HEADER_LEN))?;
        let mut body = Vec::new();
        self.f.read_to_end(&mut body)?;

        let mut cur = std::io::Cursor::new(&body[..]);
        let mut good = 0u64;
        let mut out = Vec::new();
        while let Some(rec) = read_next_record(&mut cur)? {
            out.push(rec);
            good = cur.position();
        }
        if good < body.len() as u64 {
            tracing::warn!(
                journal = %self.path.display(),
                dropped = body.len() as u64 - good,
                "truncating torn journal tail"
            );
            self.f.set_len(HEADER_LEN + good)?;
        }
        self.f.seek(SeekFrom::End(0))?;
        Ok(out)
    }

    /// Iterate from the first record.
    pub fn iter(&mut self) -> Result<JournalIter<'_>> {
        self.f.flush()?;
        self.f.seek(SeekFrom::Start(HEADER_LEN))?;
        Ok(JournalIter {
            r: BufReader::new(&mut self.f),
        })
    }
}
