//! Output storage for dumped files.
//!
//! Every artifact is addressed by a name relative to the output root. The
//! TOC builder reads produced documents back through the same interface.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Named-file store rooted at an output location.
pub trait Storage {
    /// Write `data` under `name`, replacing any previous content.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Read back the file stored under `name`.
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}

// --- Implementation: Local Directory ---

/// Files in a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Use `root` as the output directory, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative name below the root.
    ///
    /// Names come from book content (navigation hrefs), so anything that
    /// could escape the root is refused.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !is_plain {
            return Err(Error::InvalidPath(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for DirStorage {
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        fs::write(&path, data)?;
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        Ok(fs::read(path)?)
    }
}

// --- Implementation: In-Memory ---

/// Files kept in memory, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Stored file content as text (lossy).
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files.get(name).cloned().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{name} not found"),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let mut storage = MemoryStorage::new();
        storage.write("a.html", b"hello").unwrap();
        assert_eq!(storage.read("a.html").unwrap(), b"hello");
        assert_eq!(storage.get_str("a.html").as_deref(), Some("hello"));
        assert_eq!(storage.names().collect::<Vec<_>>(), vec!["a.html"]);
    }

    #[test]
    fn test_memory_storage_missing() {
        let storage = MemoryStorage::new();
        match storage.read("nope.html") {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_dir_storage_write_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirStorage::create(dir.path().join("out")).unwrap();
        storage.write("img_001.jpg", &[1, 2, 3]).unwrap();
        assert_eq!(storage.read("img_001.jpg").unwrap(), vec![1, 2, 3]);
        assert!(dir.path().join("out/img_001.jpg").exists());
    }

    #[test]
    fn test_dir_storage_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirStorage::create(dir.path()).unwrap();
        for name in ["../evil.html", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(storage.write(name, b"x"), Err(Error::InvalidPath(_))),
                "{name} should be rejected"
            );
            assert!(matches!(storage.read(name), Err(Error::InvalidPath(_))));
        }
    }
}
