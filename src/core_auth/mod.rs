//! Authentication collaborator.
//!
//! The protocol engine only consumes the decision and the two paths handed
//! back on success; the credential policy lives entirely behind
//! [`Authenticator`].

pub mod core_auth;
pub mod helper;

pub use core_auth::{PasswdAuthenticator, PasswdEntry};
pub use helper::{hash_password, verify_password};

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted {
        /// Sandbox root on the filesystem, fixed for the rest of the session.
        base_path: String,
        /// First working directory, as seen by the client.
        initial_path: String,
    },
    Denied,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, user: &str, password: &str) -> AuthOutcome;
}
