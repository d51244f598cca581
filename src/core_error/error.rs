// Error handling for the protocol engine
use crate::core_fs::FsError;
use crate::core_tls::TlsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FtpError {
    #[error("Control channel I/O error: {0}")]
    ControlChannel(#[from] std::io::Error),

    #[error("Control channel inactive for too long")]
    ControlTimeout,

    #[error("Could not establish data connection: {0}")]
    DataConnection(String),

    #[error("Active mode is not supported over TLS")]
    ActiveModeOverTls,

    #[error("Retry budget exhausted after {sent} of {total} bytes")]
    RetryExhausted { sent: usize, total: usize },

    #[error("Channel closed or in an invalid state: {0}")]
    ChannelState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl FtpError {
    pub fn to_ftp_response(&self) -> String {
        match self {
            FtpError::DataConnection(_) => "425 Can't open data connection.".to_string(),
            FtpError::ActiveModeOverTls => {
                "426 Active mode is not supported over TLS; transfer aborted.".to_string()
            }
            FtpError::RetryExhausted { .. } | FtpError::ChannelState(_) => {
                "426 Connection closed; transfer aborted.".to_string()
            }
            FtpError::Tls(e) => e.to_ftp_response(),
            FtpError::Fs(e) => e.to_ftp_response(),
            _ => "451 Requested action aborted. Local error in processing.".to_string(),
        }
    }
}
