pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod sender;
pub mod sink;
pub mod split;
pub mod spreadsheet;
