use crate::raft::types::{NodeId, Term};
use crate::util::errors::{NodeError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Trait for persistent term and vote storage
pub trait StateStore: Send {
    fn save_term(&mut self, term: Term) -> Result<()>;
    fn load_term(&self) -> Result<Term>;
    fn save_voted_for(&mut self, candidate: Option<NodeId>) -> Result<()>;
    fn load_voted_for(&self) -> Result<Option<NodeId>>;
}

/// File-based state storage: one plain-text file per datum.
/// `term.txt` holds the decimal term; `votedFor.txt` holds the candidate id
/// and is absent when no vote has been cast in the current term.
pub struct FileStateStore {
    data_dir: PathBuf,
}

impl FileStateStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        // Create data directory if it doesn't exist
        fs::create_dir_all(&data_dir)?;

        Ok(Self { data_dir })
    }

    fn term_path(&self) -> PathBuf {
        self.data_dir.join("term.txt")
    }

    fn voted_for_path(&self) -> PathBuf {
        self.data_dir.join("votedFor.txt")
    }

    fn write_sync(path: &Path, contents: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn save_term(&mut self, term: Term) -> Result<()> {
        Self::write_sync(&self.term_path(), &term.to_string())
    }

    fn load_term(&self) -> Result<Term> {
        match fs::read_to_string(self.term_path()) {
            Ok(contents) => contents
                .trim()
                .parse::<Term>()
                .map_err(|e| NodeError::CorruptStore(format!("term.txt: {}", e))),
            // Missing file means first boot
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn save_voted_for(&mut self, candidate: Option<NodeId>) -> Result<()> {
        match candidate {
            Some(id) => Self::write_sync(&self.voted_for_path(), &id),
            // Clearing the vote removes the file
            None => match fs::remove_file(self.voted_for_path()) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn load_voted_for(&self) -> Result<Option<NodeId>> {
        match fs::read_to_string(self.voted_for_path()) {
            Ok(contents) => {
                let id = contents.trim();
                if id.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(id.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_store_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStore::new(temp_dir.path().to_path_buf()).unwrap();

        assert_eq!(storage.load_term().unwrap(), 0);
        assert_eq!(storage.load_voted_for().unwrap(), None);
    }

    #[test]
    fn test_save_and_load_term() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileStateStore::new(temp_dir.path().to_path_buf()).unwrap();

        storage.save_term(5).unwrap();
        assert_eq!(storage.load_term().unwrap(), 5);
    }

    #[test]
    fn test_save_and_load_voted_for() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileStateStore::new(temp_dir.path().to_path_buf()).unwrap();

        storage.save_voted_for(Some("node-1".to_string())).unwrap();
        assert_eq!(
            storage.load_voted_for().unwrap(),
            Some("node-1".to_string())
        );

        storage.save_voted_for(None).unwrap();
        assert_eq!(storage.load_voted_for().unwrap(), None);
        assert!(!storage.voted_for_path().exists());
    }

    #[test]
    fn test_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let mut storage = FileStateStore::new(path.clone()).unwrap();
            storage.save_term(10).unwrap();
            storage.save_voted_for(Some("node-2".to_string())).unwrap();
        }

        // Reload from disk
        let storage = FileStateStore::new(path).unwrap();
        assert_eq!(storage.load_term().unwrap(), 10);
        assert_eq!(
            storage.load_voted_for().unwrap(),
            Some("node-2".to_string())
        );
    }

    #[test]
    fn test_corrupt_term_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStore::new(temp_dir.path().to_path_buf()).unwrap();

        fs::write(storage.term_path(), "not-a-number").unwrap();
        assert!(storage.load_term().is_err());
    }
}
