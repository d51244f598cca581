// Errors raised while loading TLS material or securing a connection
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Cannot load certificate chain: {0}")]
    CertificateLoadError(String),

    #[error("Cannot load private key: {0}")]
    PrivateKeyLoadError(String),

    /// The peer failed the handshake on a control or data connection.
    #[error("TLS handshake failed: {0}")]
    TlsHandshakeError(String),

    #[error("Invalid TLS server configuration: {0}")]
    TlsConfigError(String),

    #[error("TLS requested but not enabled")]
    TlsNotConfigured,
}

impl TlsError {
    pub fn to_ftp_response(&self) -> String {
        match self {
            TlsError::TlsNotConfigured => "534 Request denied for policy reasons.".to_string(),
            TlsError::TlsHandshakeError(_) => "425 Can't open data connection.".to_string(),
            _ => "451 Requested action aborted. Local error in processing.".to_string(),
        }
    }
}
