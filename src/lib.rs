pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod signal;
pub mod signature;
pub mod sources;
