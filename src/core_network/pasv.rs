use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::Session;
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Public address and port advertised in PASV replies.
///
/// The value can be changed at runtime while sessions are reading it, so
/// every access goes through the mutex.
#[derive(Debug)]
pub struct PublicAddress {
    inner: Mutex<(Ipv4Addr, u16)>,
}

impl PublicAddress {
    pub fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self {
            inner: Mutex::new((addr, port)),
        }
    }

    pub fn get(&self) -> (Ipv4Addr, u16) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, addr: Ipv4Addr, port: u16) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = (addr, port);
        info!("Public passive address set to {}:{}", addr, port);
    }
}

/// Formats the 227 sextet `a,b,c,d,p1,p2`.
pub fn encode_pasv_address(addr: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = addr.octets();
    let [p1, p2] = port.to_be_bytes();
    format!("{},{},{},{},{},{}", a, b, c, d, p1, p2)
}

/// Opens (or reuses) the session's passive listener and returns the
/// address/port to advertise.
///
/// The listener binds the public port on every interface; with a public
/// port of 0 the port actually bound is advertised. A listener left on a
/// port other than the current public one is rebound, so the advertised
/// port is always the one listening.
pub async fn start_passive_mode(
    session: &mut Session,
    public: &PublicAddress,
) -> std::io::Result<SocketAddrV4> {
    let (addr, port) = public.get();
    session.data_endpoint = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);

    if let Some(listener) = &session.passive_listener {
        let bound = listener.local_addr()?.port();
        if port != 0 && bound != port {
            info!("Public passive port moved from {} to {}, rebinding", bound, port);
            stop_passive_mode(session);
        }
    }

    let listener = match session.passive_listener.take() {
        Some(listener) => listener,
        None => {
            let listener = TcpListener::bind(session.data_endpoint).await?;
            debug!("Passive listener bound on {}", listener.local_addr()?);
            listener
        }
    };
    let bound_port = listener.local_addr()?.port();
    session.passive_listener = Some(listener);

    Ok(SocketAddrV4::new(addr, bound_port))
}

/// Closes the passive listener, if any.
pub fn stop_passive_mode(session: &mut Session) {
    if let Some(listener) = session.passive_listener.take() {
        if let Ok(addr) = listener.local_addr() {
            debug!("Passive listener on {} closed", addr);
        }
    }
}

/// Handles the PASV FTP command.
///
/// Opens the passive listener (or keeps the one already open) and tells the
/// client where to connect.
pub async fn handle_pasv_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
) -> Result<(), FtpError> {
    match start_passive_mode(session, &server.public_addr).await {
        Ok(advertised) => {
            let message = fill(
                Reply::EnterPasvMode,
                &encode_pasv_address(*advertised.ip(), advertised.port()),
            );
            debug!("PASV response: {}", message);
            send_reply(writer, &server.retry, Reply::EnterPasvMode, Some(&message)).await
        }
        Err(e) => {
            error!("Failed to start passive mode: {}", e);
            stop_passive_mode(session);
            let message = FtpError::DataConnection(e.to_string()).to_ftp_response();
            send_reply(writer, &server.retry, Reply::CantOpenData, Some(&message)).await
        }
    }
}

fn is_transient_accept_error(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
    )
}

/// Accepts one data connection on `listener`.
///
/// Each attempt is bounded by `attempt_timeout`; timeouts and transient
/// errors are retried for at most `attempts` attempts in total.
pub async fn accept_with_retry(
    listener: &TcpListener,
    attempt_timeout: Duration,
    attempts: u32,
) -> std::io::Result<(TcpStream, SocketAddr)> {
    let mut last_error = std::io::Error::from(ErrorKind::TimedOut);

    for attempt in 1..=attempts.max(1) {
        match timeout(attempt_timeout, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                debug!("Accepted data connection from {}", peer);
                return Ok((stream, peer));
            }
            Ok(Err(e)) if is_transient_accept_error(e.kind()) => {
                warn!("Transient accept error on attempt {}: {}", attempt, e);
                last_error = e;
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!("No data connection within {:?} (attempt {})", attempt_timeout, attempt);
                last_error = std::io::Error::from(ErrorKind::TimedOut);
            }
        }
    }

    Err(last_error)
}
