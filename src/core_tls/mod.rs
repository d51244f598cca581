// Implicit FTPS support: control and passive data connections are wrapped
// in TLS right after the TCP accept.

pub mod error;
pub mod tls_config;
pub mod tls_connection;

pub use error::TlsError;
pub use tls_config::TlsConfig;
pub use tls_connection::TlsConnection;
