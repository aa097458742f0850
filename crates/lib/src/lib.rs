//! Frequency agent SDK — message types, platform client, dispatch core, and
//! the poll/HTTP transports used by the CLI.

pub mod agent;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod message;
pub mod server;
