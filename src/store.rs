use crate::error::StoreError;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Set of offer links that have already been notified
pub type SeenSet = BTreeSet<String>;

/// Durable storage for the seen-set
///
/// The monitor loop is the only writer, so implementations need no locking
/// of their own.
pub trait SeenStore: Send + Sync {
    /// Read the persisted identifiers; an absent store is an empty set
    fn load(&self) -> Result<SeenSet, StoreError>;

    /// Replace the persisted identifiers with `seen`
    fn save(&self, seen: &SeenSet) -> Result<(), StoreError>;
}

/// Seen-set stored as a JSON array of strings in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the new state is written to before being renamed into place
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SeenStore for JsonFileStore {
    fn load(&self) -> Result<SeenSet, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                ::log::debug!("No seen-set at {}, starting empty", self.path.display());
                return Ok(SeenSet::new());
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let links: Vec<String> =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        ::log::debug!(
            "Loaded {} seen offers from {}",
            links.len(),
            self.path.display()
        );
        Ok(links.into_iter().collect())
    }

    fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&seen.iter().collect::<Vec<_>>())
            .map_err(|e| self.write_err(e.into()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
            }
        }

        let tmp = self.temp_path();
        let mut file = File::create(&tmp).map_err(|e| self.write_err(e))?;
        file.write_all(&json).map_err(|e| self.write_err(e))?;
        file.sync_all().map_err(|e| self.write_err(e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.write_err(e)
        })?;

        ::log::debug!("Saved {} seen offers to {}", seen.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("deal_watch_store_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&p);
        fs::create_dir_all(&p).unwrap();
        p.push("seen.json");
        p
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = JsonFileStore::new(tmp_path("missing"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let store = JsonFileStore::new(tmp_path("roundtrip"));
        let seen: SeenSet = ["https://x/a", "https://x/b", "https://x/c"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        store.save(&seen).unwrap();
        assert_eq!(store.load().unwrap(), seen);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let store = JsonFileStore::new(tmp_path("overwrite"));
        let first: SeenSet = ["https://x/a".to_string()].into_iter().collect();
        let second: SeenSet = ["https://x/b".to_string()].into_iter().collect();

        store.save(&first).unwrap();
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap(), second);
    }

    #[test]
    fn test_reads_array_written_by_hand() {
        let path = tmp_path("handwritten");
        fs::write(&path, r#"["https://x/b", "https://x/a", "https://x/a"]"#).unwrap();

        let seen = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("https://x/a"));
    }

    #[test]
    fn test_malformed_file_is_corrupt() {
        let path = tmp_path("corrupt");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::Corrupt { .. })
        ));

        // Valid JSON of the wrong shape is not merged in either
        fs::write(&path, r#"[1, 2, 3]"#).unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_unwritable_location_is_write_error() {
        let dir = tmp_path("unwritable");
        // The seen-set path is an existing directory, so the rename must fail
        let store = JsonFileStore::new(dir.parent().unwrap());
        let seen: SeenSet = ["https://x/a".to_string()].into_iter().collect();
        assert!(matches!(store.save(&seen), Err(StoreError::Write { .. })));
    }
}
