pub mod config_io;
pub mod payload_io;
pub mod watcher;
