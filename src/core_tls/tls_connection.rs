use crate::core_tls::error::TlsError;
use crate::core_tls::tls_config::TlsConfig;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tokio_rustls::{rustls, TlsAcceptor};

/// Server side TLS endpoint shared by every session.
#[derive(Clone)]
pub struct TlsConnection {
    tls_acceptor: TlsAcceptor,
}

impl TlsConnection {
    pub fn from_config(config: &TlsConfig) -> Result<Self, TlsError> {
        config.validate()?;
        Self::new(&config.cert_file, &config.key_file)
    }

    pub fn new(cert_file: &Path, key_file: &Path) -> Result<Self, TlsError> {
        if !cert_file.exists() || !key_file.exists() {
            return Err(TlsError::TlsNotConfigured);
        }

        let certs = std::fs::read(cert_file)
            .map_err(|e| TlsError::CertificateLoadError(e.to_string()))?;
        let key =
            std::fs::read(key_file).map_err(|e| TlsError::PrivateKeyLoadError(e.to_string()))?;

        let cert_chain = rustls_pemfile::certs(&mut &certs[..])
            .map_err(|e| TlsError::CertificateLoadError(e.to_string()))?;
        if cert_chain.is_empty() {
            return Err(TlsError::CertificateLoadError(format!(
                "No certificate found in {:?}",
                cert_file
            )));
        }

        let mut keys = rustls_pemfile::pkcs8_private_keys(&mut &key[..])
            .map_err(|e| TlsError::PrivateKeyLoadError(e.to_string()))?;
        let private_key = keys
            .pop()
            .ok_or_else(|| TlsError::PrivateKeyLoadError("No private key found".to_string()))?;

        let cert_chain: Vec<rustls::Certificate> =
            cert_chain.into_iter().map(rustls::Certificate).collect();
        let private_key = rustls::PrivateKey(private_key);

        let config = rustls::ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(cert_chain, private_key)
            .map_err(|e| TlsError::TlsConfigError(e.to_string()))?;

        debug!("TLS acceptor ready with certificate {:?}", cert_file);
        Ok(Self {
            tls_acceptor: TlsAcceptor::from(Arc::new(config)),
        })
    }

    /// Runs the server handshake over `stream`.
    pub async fn accept_tls<S>(&self, stream: S) -> Result<TlsStream<S>, TlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.tls_acceptor
            .accept(stream)
            .await
            .map_err(|e| TlsError::TlsHandshakeError(e.to_string()))
    }
}
