//! microftpd: a small RFC 959 FTP server.
//!
//! The protocol engine (session state machine, path sandbox, data transfer
//! process) lives in `core_network` and `core_ftpcommand`; authentication
//! and storage are reached through the `core_auth` and `core_fs` traits.

pub mod config;
pub mod constants;
pub mod core_auth;
pub mod core_cli;
pub mod core_error;
pub mod core_fs;
pub mod core_ftpcommand;
pub mod core_log;
pub mod core_network;
pub mod core_tls;
pub mod helpers;
pub mod server;
pub mod session;

pub use config::Config;
pub use server::ServerContext;
