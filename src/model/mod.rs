pub mod task;
pub mod payload;
pub mod tree;
pub mod config;
pub mod view;

pub use task::*;
pub use payload::*;
pub use tree::*;
pub use config::*;
pub use view::*;
