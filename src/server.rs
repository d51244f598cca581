use crate::config::Config;
use crate::core_auth::Authenticator;
use crate::core_error::FtpError;
use crate::core_fs::FileSystem;
use crate::core_ftpcommand::reply::{format_reply, Reply};
use crate::core_network::network::handle_control_connection;
use crate::core_network::pasv::PublicAddress;
use crate::core_network::writer::{send_buffer, RetryPolicy};
use crate::core_tls::TlsConnection;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Everything a session needs from the server, shared by every session task.
pub struct ServerContext {
    pub config: Config,
    pub authenticator: Arc<dyn Authenticator>,
    pub fs: Arc<dyn FileSystem>,
    /// Present when the server runs in implicit TLS mode.
    pub tls: Option<TlsConnection>,
    pub public_addr: PublicAddress,
    pub retry: RetryPolicy,
    pub banner: Option<String>,
}

impl ServerContext {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, FtpError> {
        config.validate()?;

        if config.limits.path_len_max > fs.max_path_len() {
            return Err(FtpError::Config(format!(
                "path_len_max {} exceeds the filesystem limit of {}",
                config.limits.path_len_max,
                fs.max_path_len()
            )));
        }

        let tls = if config.tls.enabled {
            Some(TlsConnection::from_config(&config.tls)?)
        } else {
            None
        };

        let public_addr = PublicAddress::new(config.pasv_ip()?, config.server.pasv_port);
        let retry = RetryPolicy::from_config(&config.timeouts);

        Ok(Self {
            config,
            authenticator,
            fs,
            tls,
            public_addr,
            retry,
            banner: None,
        })
    }

    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner;
        self
    }

    /// Changes the address advertised by later PASV replies.
    pub fn set_public_addr(&self, addr: Ipv4Addr, port: u16) {
        self.public_addr.set(addr, port);
    }

    /// Longest virtual or absolute path a session may produce.
    pub fn path_len_max(&self) -> usize {
        self.config.limits.path_len_max
    }
}

/// Binds the control port and serves sessions until the listener fails.
pub async fn run(ctx: Arc<ServerContext>) -> Result<()> {
    let bind_ip: Ipv4Addr = ctx
        .config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", ctx.config.server.bind_address))?;
    let addr = SocketAddrV4::new(bind_ip, ctx.config.ctrl_port());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind control port {}", addr))?;
    info!("Server listening on {}", addr);

    serve(listener, ctx).await
}

/// Accept loop. At most `max_sessions` sessions run at once; extra
/// connections get a 421 and are closed.
pub async fn serve(listener: TcpListener, ctx: Arc<ServerContext>) -> Result<()> {
    let slots = Arc::new(Semaphore::new(ctx.config.server.max_sessions));

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept control connection: {}", e);
                continue;
            }
        };
        info!("New connection from {}", peer);

        let ctx = Arc::clone(&ctx);
        match Arc::clone(&slots).try_acquire_owned() {
            Ok(permit) => {
                tokio::spawn(async move {
                    if let Err(e) = run_session(socket, Arc::clone(&ctx)).await {
                        error!("Session with {} ended with error: {}", peer, e);
                    }
                    info!("Connection closed for {}", peer);
                    drop(permit);
                });
            }
            Err(_) => {
                warn!("Session limit reached, refusing {}", peer);
                tokio::spawn(async move {
                    if let Err(e) = refuse_session(socket, ctx).await {
                        debug!("Could not notify refused client {}: {}", peer, e);
                    }
                });
            }
        }
    }
}

async fn handshake(socket: TcpStream, ctx: &ServerContext) -> Result<Box<dyn SessionStream>, FtpError> {
    match &ctx.tls {
        Some(tls) => {
            let stream = timeout(ctx.config.timeouts.ctrl_rx(), tls.accept_tls(socket))
                .await
                .map_err(|_| FtpError::ControlTimeout)??;
            Ok(Box::new(stream))
        }
        None => Ok(Box::new(socket)),
    }
}

/// Control stream of a session, plain or TLS.
trait SessionStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SessionStream for T {}

async fn run_session(socket: TcpStream, ctx: Arc<ServerContext>) -> Result<(), FtpError> {
    let stream = handshake(socket, &ctx).await?;
    handle_control_connection(stream, ctx).await
}

async fn refuse_session(socket: TcpStream, ctx: Arc<ServerContext>) -> Result<(), FtpError> {
    let mut stream = handshake(socket, &ctx).await?;
    send_buffer(&mut stream, &format_reply(Reply::NoService, None), &ctx.retry).await?;
    let _ = timeout(ctx.retry.attempt_timeout, stream.shutdown()).await;
    Ok(())
}
