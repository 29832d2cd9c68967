pub mod config;
pub mod machine;
pub mod monitor;
pub mod raft;
pub mod storage;
pub mod transport;
pub mod util;
