use std::io::Write;
use std::path::{Path, PathBuf};

use mizu_core::error::{MizuError, Result};
use mizu_core::library::Library;
use mizu_core::{extract_pages, list_pages};

fn progress_bar() -> impl FnMut(f32) {
    move |p| {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\rmeasuring pages {:>3}%", (p * 100.0).round() as u32);
        if p >= 1.0 {
            let _ = writeln!(err);
        }
    }
}

pub fn handle_scan(lib: &Library, dir: &Path) -> Result<()> {
    let report = lib.scan(dir)?;
    for a in &report.added {
        println!("added  {}  {:>4} pages  {}", a.id, a.total_pages, a.name);
    }
    for (p, why) in &report.failed {
        println!("failed {}  ({why})", p.display());
    }
    println!(
        "{} added, {} already known, {} failed",
        report.added.len(),
        report.known,
        report.failed.len()
    );
    Ok(())
}

pub fn handle_list(lib: &Library) -> Result<()> {
    for a in lib.archives()? {
        let read = lib
            .progress(&a.id)?
            .map(|p| format!("{}/{}", p.last_page + 1, p.total_pages))
            .unwrap_or_else(|| "-".to_string());
        println!("{}  {:>9}  {}", a.id, read, a.name);
    }
    Ok(())
}

pub fn handle_pages(lib: &Library, archive: &str) -> Result<()> {
    let a = lib.resolve(archive)?;
    let pages = lib.ensure_pages(&a, &mut progress_bar())?;
    for (i, p) in pages.iter().enumerate() {
        println!("#{:<5} ratio={:.4}  {}", i, p.aspect_ratio, p.name);
    }
    Ok(())
}

pub fn handle_get(lib: &Library, archive: &str, index: usize, out: Option<PathBuf>) -> Result<()> {
    let a = lib.resolve(archive)?;
    let session = lib.open_session(&a.id)?;
    let cached = session.page_file(index).ok_or_else(|| {
        MizuError::NotFound(format!("page {index} of {} ({} pages)", a.name, session.len()))
    })?;
    if let Some(out) = out {
        std::fs::copy(&cached, &out)?;
    }
    println!("{}", cached.display());
    Ok(())
}

pub fn handle_progress(lib: &Library, archive: &str, page: Option<u32>) -> Result<()> {
    let a = lib.resolve(archive)?;
    if let Some(page) = page {
        lib.set_progress(&a.id, page)?;
    }
    match lib.progress(&a.id)? {
        Some(p) => println!("{}: page {} of {}", a.name, p.last_page + 1, p.total_pages),
        None => println!("{}: unread", a.name),
    }
    Ok(())
}

pub fn handle_index(archive: &Path) -> Result<()> {
    for (i, p) in list_pages(archive)?.iter().enumerate() {
        println!("#{:<5} {:>10} bytes  {}", i, p.size, p.name);
    }
    Ok(())
}

pub fn handle_extract(archive: &Path, dest: &Path) -> Result<()> {
    let written = extract_pages(archive, dest)?;
    eprintln!("extracted {} pages to {}", written.len(), dest.display());
    Ok(())
}

pub fn handle_evict(lib: &Library, archive: &str) -> Result<()> {
    let a = lib.resolve(archive)?;
    lib.cache().clear_archive(&a.id)?;
    eprintln!("evict: OK");
    Ok(())
}

pub fn handle_sweep(lib: &Library) -> Result<()> {
    let gone = lib.sweep_missing()?;
    for a in &gone {
        println!("removed {}  {}", a.id, a.path.display());
    }
    eprintln!("sweep: {} removed", gone.len());
    Ok(())
}

pub fn handle_compact(lib: &Library) -> Result<()> {
    lib.compact()?;
    eprintln!("compact: OK");
    Ok(())
}

pub fn handle_stats(lib: &Library) -> Result<()> {
    let s = lib.stats()?;
    println!("archives      {}", s.archives);
    println!("pages         {}", s.pages);
    println!("started       {}", s.read_archives);
    println!("cached files  {}", s.cache_files);
    println!("cached bytes  {}", s.cache_bytes);
    Ok(())
}
