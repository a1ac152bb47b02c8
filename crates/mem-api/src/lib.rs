//! HTTP façade over a `MemoryClient`.

pub mod config;
pub mod error;
pub mod server;
