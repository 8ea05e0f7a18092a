pub mod broadcast;
pub mod engine;
pub mod scheduler;

pub use engine::{Fetcher, SyncEngine, SyncError};
