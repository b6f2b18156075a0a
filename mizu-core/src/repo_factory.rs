use crate::error::Result;
use crate::repo::{OpenParams, PageRepo};
use crate::repo_zip::ZipPageRepo;

pub enum Backend {
    Zip,
}

pub fn open_repo(backend: Backend, p: OpenParams) -> Result<Box<dyn PageRepo>> {
    match backend {
        Backend::Zip => Ok(Box::new(ZipPageRepo::new(p)?)),
    }
}
