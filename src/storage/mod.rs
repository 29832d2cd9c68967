pub mod log_store;
pub mod state_store;

pub use log_store::{FileLogStore, LogStore};
pub use state_store::{FileStateStore, StateStore};
