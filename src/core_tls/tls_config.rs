use crate::core_tls::error::TlsError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Serve implicit FTPS on the secure ports
    pub enabled: bool,

    /// PEM certificate chain
    pub cert_file: PathBuf,

    /// PEM private key (PKCS#8)
    pub key_file: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_file: PathBuf::from("/etc/microftpd/cert.pem"),
            key_file: PathBuf::from("/etc/microftpd/key.pem"),
        }
    }
}

impl TlsConfig {
    /// Checks that the certificate and key exist when TLS is enabled.
    pub fn validate(&self) -> Result<(), TlsError> {
        if self.enabled {
            if !self.cert_file.exists() {
                return Err(TlsError::CertificateLoadError(format!(
                    "Certificate file not found: {:?}",
                    self.cert_file
                )));
            }

            if !self.key_file.exists() {
                return Err(TlsError::PrivateKeyLoadError(format!(
                    "Private key file not found: {:?}",
                    self.key_file
                )));
            }
        }

        Ok(())
    }
}
