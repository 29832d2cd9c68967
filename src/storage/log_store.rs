use crate::raft::types::{LogEntry, LogIndex, Term};
use crate::util::errors::{NodeError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// Trait for persistent log storage
pub trait LogStore: Send {
    /// Append one entry past the current end of the log.
    fn append(&mut self, entry: LogEntry) -> Result<()>;
    fn get(&self, index: LogIndex) -> Option<&LogEntry>;
    fn last_index(&self) -> LogIndex;
    fn last_term(&self) -> Term;
    /// Drop every entry at `from_index` and above, in memory and on disk.
    fn truncate(&mut self, from_index: LogIndex) -> Result<()>;
    /// Full log including the sentinel, ordered by index.
    fn entries(&self) -> &[LogEntry];
}

/// File-based log storage. Keeps the whole log in memory with the index-0
/// sentinel at position 0, so vector positions equal log indices. On disk
/// the log is `log.txt` with one `index,term,base64Payload` line per real
/// entry; the sentinel is synthesized at load and never written.
pub struct FileLogStore {
    data_dir: PathBuf,
    entries: Vec<LogEntry>,
}

impl FileLogStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        // Create data directory if it doesn't exist
        fs::create_dir_all(&data_dir)?;

        let mut storage = Self {
            data_dir,
            entries: vec![LogEntry::sentinel()],
        };

        // Load existing logs from disk
        storage.load_from_disk()?;

        Ok(storage)
    }

    fn log_file_path(&self) -> PathBuf {
        self.data_dir.join("log.txt")
    }

    fn encode_line(entry: &LogEntry) -> String {
        format!(
            "{},{},{}\n",
            entry.index,
            entry.term,
            BASE64.encode(&entry.payload)
        )
    }

    fn parse_line(line: &str) -> std::result::Result<LogEntry, String> {
        let parts: Vec<&str> = line.splitn(3, ',').collect();
        if parts.len() != 3 {
            return Err(format!("expected 3 fields, got {}", parts.len()));
        }

        let index = parts[0]
            .parse::<LogIndex>()
            .map_err(|e| format!("bad index: {}", e))?;
        let term = parts[1]
            .parse::<Term>()
            .map_err(|e| format!("bad term: {}", e))?;
        let payload = BASE64
            .decode(parts[2].trim_end())
            .map_err(|e| format!("bad payload: {}", e))?;

        Ok(LogEntry::new(index, term, payload))
    }

    fn load_from_disk(&mut self) -> Result<()> {
        let log_path = self.log_file_path();

        if !log_path.exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(&log_path)?);

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entry = Self::parse_line(&line)
                .map_err(|e| NodeError::CorruptStore(format!("log.txt line {}: {}", line_no + 1, e)))?;

            let expected = self.last_index() + 1;
            if entry.index != expected {
                return Err(NodeError::CorruptStore(format!(
                    "log.txt line {}: index {}, expected {}",
                    line_no + 1,
                    entry.index,
                    expected
                )));
            }

            self.entries.push(entry);
        }

        tracing::info!("Loaded {} log entries from disk", self.entries.len() - 1);

        Ok(())
    }

    fn rewrite_to_disk(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.log_file_path())?;

        for entry in &self.entries[1..] {
            file.write_all(Self::encode_line(entry).as_bytes())?;
        }
        file.sync_all()?;

        Ok(())
    }
}

impl LogStore for FileLogStore {
    fn append(&mut self, entry: LogEntry) -> Result<()> {
        // Indices must stay contiguous past the current end
        if entry.index != self.last_index() + 1 {
            return Err(NodeError::LogInconsistency);
        }

        // Disk first: an entry is only acknowledged once durable
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.log_file_path())?;

        file.write_all(Self::encode_line(&entry).as_bytes())?;
        file.sync_all()?;

        self.entries.push(entry);

        Ok(())
    }

    fn get(&self, index: LogIndex) -> Option<&LogEntry> {
        self.entries.get(index as usize)
    }

    fn last_index(&self) -> LogIndex {
        self.entries.last().map(|e| e.index).unwrap_or(0)
    }

    fn last_term(&self) -> Term {
        self.entries.last().map(|e| e.term).unwrap_or(0)
    }

    fn truncate(&mut self, from_index: LogIndex) -> Result<()> {
        // The sentinel is never dropped
        if from_index == 0 || from_index > self.last_index() {
            return Ok(());
        }

        self.entries.truncate(from_index as usize);
        self.rewrite_to_disk()?;

        tracing::info!("Truncated log from index {}", from_index);

        Ok(())
    }

    fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_log_has_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileLogStore::new(temp_dir.path().to_path_buf()).unwrap();

        assert_eq!(storage.last_index(), 0);
        assert_eq!(storage.last_term(), 0);
        assert_eq!(storage.get(0), Some(&LogEntry::sentinel()));
        assert_eq!(storage.entries().len(), 1);
    }

    #[test]
    fn test_append_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileLogStore::new(temp_dir.path().to_path_buf()).unwrap();

        storage.append(LogEntry::new(1, 1, vec![1, 2, 3])).unwrap();
        storage.append(LogEntry::new(2, 1, vec![4, 5, 6])).unwrap();

        assert_eq!(storage.last_index(), 2);
        assert_eq!(storage.last_term(), 1);
        assert_eq!(storage.get(1).unwrap().payload, vec![1, 2, 3]);
        assert_eq!(storage.get(2).unwrap().payload, vec![4, 5, 6]);
        assert_eq!(storage.get(3), None);
    }

    #[test]
    fn test_append_rejects_gap() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileLogStore::new(temp_dir.path().to_path_buf()).unwrap();

        let result = storage.append(LogEntry::new(5, 1, vec![]));
        assert!(matches!(result, Err(NodeError::LogInconsistency)));
    }

    #[test]
    fn test_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let mut storage = FileLogStore::new(path.clone()).unwrap();
            storage.append(LogEntry::new(1, 1, b"hello".to_vec())).unwrap();
            storage.append(LogEntry::new(2, 2, b"world".to_vec())).unwrap();
        }

        // Reload from disk
        let storage = FileLogStore::new(path.clone()).unwrap();
        assert_eq!(storage.last_index(), 2);
        assert_eq!(storage.last_term(), 2);
        assert_eq!(storage.get(1).unwrap().payload, b"hello".to_vec());

        // The sentinel is synthesized, not stored
        let raw = fs::read_to_string(path.join("log.txt")).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[test]
    fn test_truncate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let mut storage = FileLogStore::new(path.clone()).unwrap();
            for i in 1..=3 {
                storage.append(LogEntry::new(i, 1, vec![i as u8])).unwrap();
            }

            storage.truncate(2).unwrap();
            assert_eq!(storage.last_index(), 1);
        }

        // Truncation survives reopen
        let storage = FileLogStore::new(path).unwrap();
        assert_eq!(storage.last_index(), 1);
        assert_eq!(storage.get(2), None);
    }

    #[test]
    fn test_corrupt_line_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("log.txt"), "1,1,aGk=\nnot a log line\n").unwrap();

        assert!(FileLogStore::new(path).is_err());
    }

    #[test]
    fn test_gapped_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("log.txt"), "1,1,aGk=\n3,1,aGk=\n").unwrap();

        assert!(FileLogStore::new(path).is_err());
    }
}
