pub mod command;

pub use command::Command;

use crate::raft::types::LogEntry;
use crate::util::errors::Result;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// Deterministic interpreter of committed log entries
pub trait StateMachine: Send {
    fn apply(&mut self, entry: &LogEntry) -> Result<()>;
    /// Commands applied since process start
    fn applied_count(&self) -> u64;
}

/// State machine producing the node's working artifacts: files stored in
/// the data directory and an append-only model registry.
pub struct WorkerMachine {
    data_dir: PathBuf,
    applied: u64,
}

impl WorkerMachine {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        // Create data directory if it doesn't exist
        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            data_dir,
            applied: 0,
        })
    }

    fn registry_path(&self) -> PathBuf {
        self.data_dir.join("models_registry.txt")
    }

    fn store_file(&self, name: &str, content: &[u8]) -> Result<()> {
        // Overwrites any existing file; replays converge on the same bytes
        fs::write(self.data_dir.join(name), content)?;

        tracing::info!("Stored file {} ({} bytes)", name, content.len());

        Ok(())
    }

    fn register_model(
        &self,
        model_id: &str,
        model_type: &str,
        accuracy: &str,
        timestamp: &str,
    ) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.registry_path())?;

        writeln!(file, "{},{},{},{}", model_id, model_type, accuracy, timestamp)?;

        tracing::info!("Registered model {} ({})", model_id, model_type);

        Ok(())
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.data_dir.join(name)) {
            Ok(()) => {
                tracing::info!("Deleted file {}", name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Delete of missing file {}", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl StateMachine for WorkerMachine {
    fn apply(&mut self, entry: &LogEntry) -> Result<()> {
        match Command::parse(&entry.payload)? {
            Command::StoreFile { name, content, .. } => self.store_file(&name, &content)?,
            Command::RegisterModel {
                model_id,
                model_type,
                accuracy,
                timestamp,
            } => self.register_model(&model_id, &model_type, &accuracy, &timestamp)?,
            Command::DeleteFile { name } => self.delete_file(&name)?,
            Command::Nop => {
                tracing::debug!("Applied NOP at index {}", entry.index);
            }
            Command::Unknown(tag) => {
                tracing::debug!("Ignoring unknown command {} at index {}", tag, entry.index);
            }
        }

        self.applied += 1;

        Ok(())
    }

    fn applied_count(&self) -> u64 {
        self.applied
    }
}
