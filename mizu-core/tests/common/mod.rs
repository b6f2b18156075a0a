#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    GrayImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub enum Item {
    Dir(String),
    File(String, Vec<u8>),
}

impl Item {
    pub fn dir(name: impl Into<String>) -> Self {
        Item::Dir(name.into())
    }

    pub fn file(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Item::File(name.into(), bytes)
    }
}

pub fn write_zip(path: &Path, items: Vec<Item>) -> PathBuf {
    let f = File::create(path).expect("create zip");
    let mut zw = ZipWriter::new(f);
    let opts = SimpleFileOptions::default();
    for item in items {
        match item {
            Item::Dir(name) => zw.add_directory(name, opts).expect("add dir"),
            Item::File(name, bytes) => {
                zw.start_file(name, opts).expect("start file");
                zw.write_all(&bytes).expect("write entry");
            }
        }
    }
    zw.finish().expect("finish zip");
    path.to_path_buf()
}

/// A small comic: three pages out of lexical order plus noise entries.
pub fn comic(path: &Path) -> PathBuf {
    write_zip(
        path,
        vec![
            Item::dir("chapter/"),
            Item::file("chapter/page10.png", png(900, 1350)),
            Item::file("chapter/page2.png", png(800, 1200)),
            Item::file("ComicInfo.xml", b"<ComicInfo/>".to_vec()),
            Item::file("chapter/page1.PNG", png(1600, 1200)),
        ],
    )
}
