//! Named GIFs looked up in a directory on disk

use gifplay::ResourceLocator;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Clone)]
pub struct DirLocator {
    dir: PathBuf,
}

impl DirLocator {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_of(&self, name: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{name}.{extension}"))
    }
}

impl ResourceLocator for DirLocator {
    fn resolve(&self, name: &str, extension: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_of(name, extension)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
