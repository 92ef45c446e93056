use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::common::collections::HashMap;
use crate::common::config::data_dir;
use crate::common::error::DockError;

/// Durable string storage, the analogue of a browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DockError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), DockError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DockError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DockError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per entry inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn in_data_dir() -> Self { Self::new(data_dir().join("layouts")) }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, DockError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DockError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }
}
