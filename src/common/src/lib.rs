pub mod cli;
pub mod config;
pub mod logging;
pub mod paths;

pub use config::{ActionType, Condition, Configuration, LogEntry, Paths};
