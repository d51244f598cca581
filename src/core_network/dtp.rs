//! Data transfer process: one data connection, one directional transfer.

use crate::constants::{MONTH_NAMES, NET_BUF_LEN};
use crate::core_error::FtpError;
use crate::core_fs::{DirEntry, FileHandle, FileSystem, FsError, OpenMode};
use crate::core_ftpcommand::utils::{to_fs_path, ResolvedPath};
use crate::core_network::pasv::accept_with_retry;
use crate::core_network::writer::{send_buffer, RetryPolicy};
use crate::server::ServerContext;
use crate::session::Session;
use chrono::Datelike;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Any stream a transfer can run over (plain TCP or TLS).
pub trait DataChannel: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> DataChannel for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    NameList,
    List,
    Retrieve,
    Store,
    Append,
}

#[derive(Debug)]
pub enum TransferStatus {
    Complete,
    /// The data connection could not be established.
    NoConnection(FtpError),
    /// The transfer target could not be opened.
    OpenFailed,
    /// The restart offset could not be applied.
    SeekFailed(u64),
    Aborted,
}

/// What one DTP run moves and where.
#[derive(Debug, Clone)]
pub struct TransferRequest<'a> {
    pub kind: TransferKind,
    pub target: &'a ResolvedPath,
    /// Offset staged by REST, if any.
    pub restart_offset: Option<u64>,
}

/// Establishes the data connection for the session's current mode.
///
/// Passive mode accepts on the session's listener (TLS-wrapped when the
/// server is secured); active mode connects to the endpoint given by PORT.
pub async fn open_data_channel(
    server: &ServerContext,
    session: &Session,
) -> Result<Box<dyn DataChannel>, FtpError> {
    let timeouts = &server.config.timeouts;

    if let Some(listener) = &session.passive_listener {
        let (stream, _) = accept_with_retry(
            listener,
            timeouts.dtp_accept(),
            timeouts.dtp_accept_retry,
        )
        .await
        .map_err(|e| FtpError::DataConnection(e.to_string()))?;

        return match &server.tls {
            Some(tls) => {
                let secured = timeout(timeouts.dtp_accept(), tls.accept_tls(stream))
                    .await
                    .map_err(|_| FtpError::DataConnection("TLS handshake timed out".into()))??;
                Ok(Box::new(secured))
            }
            None => Ok(Box::new(stream)),
        };
    }

    if server.tls.is_some() {
        return Err(FtpError::ActiveModeOverTls);
    }

    let endpoint = session.data_endpoint;
    debug!("Connecting active data channel to {}", endpoint);
    match timeout(timeouts.dtp_connect(), TcpStream::connect(endpoint)).await {
        Ok(Ok(stream)) => Ok(Box::new(stream)),
        Ok(Err(e)) => Err(FtpError::DataConnection(format!("{}: {}", endpoint, e))),
        Err(_) => Err(FtpError::DataConnection(format!(
            "{}: connect timed out",
            endpoint
        ))),
    }
}

/// Connects, runs one transfer, and closes the data connection.
pub async fn execute(
    server: &ServerContext,
    session: &Session,
    request: TransferRequest<'_>,
) -> TransferStatus {
    let mut channel = match open_data_channel(server, session).await {
        Ok(channel) => channel,
        Err(e) => {
            error!("Data connection failed: {}", e);
            return TransferStatus::NoConnection(e);
        }
    };

    info!("START transfer {:?} {:?}", request.kind, request.target.virtual_path);
    let status = run_transfer(
        channel.as_mut(),
        server.fs.as_ref(),
        &request,
        &server.retry,
        server.config.timeouts.dtp_rx(),
    )
    .await;
    info!("STOP transfer {:?}: {:?}", request.kind, status);

    if let Err(e) = timeout(server.retry.attempt_timeout, channel.shutdown()).await {
        debug!("Data channel shutdown timed out: {}", e);
    }
    status
}

/// Moves the bytes of `request` over an already established channel.
pub async fn run_transfer(
    channel: &mut dyn DataChannel,
    fs: &dyn FileSystem,
    request: &TransferRequest<'_>,
    policy: &RetryPolicy,
    rx_timeout: Duration,
) -> TransferStatus {
    let path = to_fs_path(&request.target.absolute_path, fs.separator());

    match request.kind {
        TransferKind::NameList | TransferKind::List => {
            send_listing(channel, fs, &path, request.kind, policy).await
        }
        TransferKind::Retrieve => {
            send_file(channel, fs, &path, request.restart_offset, policy).await
        }
        TransferKind::Store | TransferKind::Append => {
            receive_file(channel, fs, &path, request, rx_timeout).await
        }
    }
}

/// One `ls -l` style line.
pub fn format_list_entry(entry: &DirEntry) -> String {
    let attr = &entry.attributes;
    let dir = if attr.is_dir { 'd' } else { '-' };
    let wr = if attr.is_read_only { '-' } else { 'w' };
    let month = MONTH_NAMES[attr.modified.month0() as usize];

    format!(
        "{}r{}-r{}-r{}-   1 user     group    {:>8} {:>3} {:>2}  {:>4} {}\r\n",
        dir,
        wr,
        wr,
        wr,
        attr.size,
        month,
        attr.modified.day(),
        attr.modified.year(),
        entry.name
    )
}

async fn send_listing(
    channel: &mut dyn DataChannel,
    fs: &dyn FileSystem,
    path: &str,
    kind: TransferKind,
    policy: &RetryPolicy,
) -> TransferStatus {
    let mut dir = match fs.open_dir(path).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!("Cannot open directory {:?}: {}", path, e);
            return TransferStatus::OpenFailed;
        }
    };

    let mut batch: Vec<u8> = Vec::with_capacity(NET_BUF_LEN);
    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Directory read failed in {:?}: {}", path, e);
                return TransferStatus::Aborted;
            }
        };

        let line = match kind {
            TransferKind::List if entry.attributes.is_hidden => continue,
            TransferKind::List => format_list_entry(&entry),
            _ => format!("{}\r\n", entry.name),
        };

        if !batch.is_empty() && batch.len() + line.len() >= NET_BUF_LEN {
            if let Err(e) = send_buffer(channel, &batch, policy).await {
                warn!("Listing send failed: {}", e);
                return TransferStatus::Aborted;
            }
            batch.clear();
        }
        batch.extend_from_slice(line.as_bytes());
    }

    if !batch.is_empty() {
        if let Err(e) = send_buffer(channel, &batch, policy).await {
            warn!("Listing send failed: {}", e);
            return TransferStatus::Aborted;
        }
    }
    TransferStatus::Complete
}

/// Fills `buf` from `file`; a result shorter than `buf` means end of file.
async fn read_chunk(file: &mut dyn FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn send_file(
    channel: &mut dyn DataChannel,
    fs: &dyn FileSystem,
    path: &str,
    restart_offset: Option<u64>,
    policy: &RetryPolicy,
) -> TransferStatus {
    let mut file = match fs.open_file(path, OpenMode::Read).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Cannot open {:?} for reading: {}", path, e);
            return TransferStatus::OpenFailed;
        }
    };

    if let Some(offset) = restart_offset {
        if let Err(e) = file.seek(offset).await {
            warn!("Cannot seek {:?} to {}: {}", path, offset, e);
            return TransferStatus::SeekFailed(offset);
        }
    }

    let mut buf = vec![0u8; NET_BUF_LEN];
    loop {
        let n = match read_chunk(file.as_mut(), &mut buf).await {
            Ok(n) => n,
            Err(e) => {
                error!("Read of {:?} failed: {}", path, e);
                return TransferStatus::Aborted;
            }
        };
        if n == 0 {
            break;
        }
        if let Err(e) = send_buffer(channel, &buf[..n], policy).await {
            warn!("Sending {:?} failed: {}", path, e);
            return TransferStatus::Aborted;
        }
        if n < NET_BUF_LEN {
            break;
        }
    }

    TransferStatus::Complete
}

async fn receive_file(
    channel: &mut dyn DataChannel,
    fs: &dyn FileSystem,
    path: &str,
    request: &TransferRequest<'_>,
    rx_timeout: Duration,
) -> TransferStatus {
    let mode = match (request.kind, request.restart_offset) {
        (TransferKind::Store, None) => OpenMode::Create,
        _ => OpenMode::Append,
    };

    let mut file = match fs.open_file(path, mode).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Cannot open {:?} in {:?} mode: {}", path, mode, e);
            return TransferStatus::OpenFailed;
        }
    };

    if let Some(offset) = request.restart_offset {
        if let Err(e) = file.seek(offset).await {
            warn!("Cannot seek {:?} to {}: {}", path, offset, e);
            return TransferStatus::SeekFailed(offset);
        }
    }

    let mut buf = vec![0u8; NET_BUF_LEN];
    loop {
        let n = match timeout(rx_timeout, channel.read(&mut buf)).await {
            // The client half-closes (or goes quiet) once everything is sent.
            Err(_) | Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!("Data channel receive failed: {}", e);
                return TransferStatus::Aborted;
            }
        };

        let mut written = 0;
        while written < n {
            match file.write(&buf[written..n]).await {
                Ok(0) => {
                    error!("Short write to {:?}", path);
                    return TransferStatus::Aborted;
                }
                Ok(w) => written += w,
                Err(e) => {
                    error!("Write to {:?} failed: {}", path, e);
                    return TransferStatus::Aborted;
                }
            }
        }
    }

    match file.close().await {
        Ok(()) => TransferStatus::Complete,
        Err(e) => {
            error!("Closing {:?} failed: {}", path, e);
            TransferStatus::Aborted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core_auth::{AuthOutcome, Authenticator};
    use crate::core_fs::{EntryAttributes, LocalFileSystem};
    use crate::core_ftpcommand::utils::resolve_path;
    use crate::core_network::writer::tests::{fast_policy, ScriptedWriter, Step};
    use crate::core_tls::TlsConfig;
    use chrono::NaiveDate;
    use std::io::ErrorKind;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::duplex;
    use tokio::net::TcpListener;

    struct NoUsers;

    impl Authenticator for NoUsers {
        fn authenticate(&self, _user: &str, _password: &str) -> AuthOutcome {
            AuthOutcome::Denied
        }
    }

    fn entry(name: &str, is_dir: bool, is_read_only: bool, size: u64) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            attributes: EntryAttributes {
                size,
                modified: NaiveDate::from_ymd_opt(2021, 3, 7)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                is_dir,
                is_hidden: name.starts_with('.'),
                is_read_only,
            },
        }
    }

    fn target(dir: &TempDir, token: &str) -> ResolvedPath {
        resolve_path(dir.path().to_str().unwrap(), "/", token, 4096).unwrap()
    }

    #[test]
    fn test_format_list_entry() {
        assert_eq!(
            format_list_entry(&entry("notes.txt", false, false, 1234)),
            "-rw-rw-rw-   1 user     group        1234 mar  7  2021 notes.txt\r\n"
        );
        assert_eq!(
            format_list_entry(&entry("pub", true, true, 0)),
            "dr--r--r--   1 user     group           0 mar  7  2021 pub\r\n"
        );
    }

    #[tokio::test]
    async fn test_list_skips_hidden_entries_but_nlst_does_not() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("visible.txt"), b"abc").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, ".");

        for (kind, expect_hidden) in [(TransferKind::List, false), (TransferKind::NameList, true)] {
            let (mut server, mut client) = duplex(64 * 1024);
            let request = TransferRequest {
                kind,
                target: &resolved,
                restart_offset: None,
            };
            let status = run_transfer(
                &mut server,
                &fs,
                &request,
                &fast_policy(3),
                Duration::from_millis(100),
            )
            .await;
            assert!(matches!(status, TransferStatus::Complete));
            drop(server);

            let mut listing = String::new();
            client.read_to_string(&mut listing).await.unwrap();
            assert!(listing.contains("visible.txt\r\n"));
            assert_eq!(listing.contains(".hidden"), expect_hidden, "{:?}", kind);
        }
    }

    #[tokio::test]
    async fn test_large_listing_is_batched() {
        let dir = TempDir::new().unwrap();
        for i in 0..200 {
            std::fs::write(dir.path().join(format!("file-{:03}.dat", i)), b"").unwrap();
        }
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, ".");
        let (mut server, mut client) = duplex(256 * 1024);
        let request = TransferRequest {
            kind: TransferKind::NameList,
            target: &resolved,
            restart_offset: None,
        };

        let status = run_transfer(
            &mut server,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::Complete));
        drop(server);

        let mut listing = String::new();
        client.read_to_string(&mut listing).await.unwrap();
        assert_eq!(listing.lines().count(), 200);
    }

    #[tokio::test]
    async fn test_retrieve_from_restart_offset() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("blob.bin"), &content).unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, "blob.bin");
        let (mut server, mut client) = duplex(64 * 1024);
        let request = TransferRequest {
            kind: TransferKind::Retrieve,
            target: &resolved,
            restart_offset: Some(100),
        };

        let status = run_transfer(
            &mut server,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::Complete));
        drop(server);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, content[100..]);
    }

    #[tokio::test]
    async fn test_retrieve_missing_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, "missing");
        let (mut server, _client) = duplex(1024);
        let request = TransferRequest {
            kind: TransferKind::Retrieve,
            target: &resolved,
            restart_offset: None,
        };

        let status = run_transfer(
            &mut server,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::OpenFailed));
    }

    #[tokio::test]
    async fn test_store_then_append() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, "upload.txt");

        for (kind, payload) in [
            (TransferKind::Store, &b"first"[..]),
            (TransferKind::Append, &b" second"[..]),
        ] {
            let (mut server, mut client) = duplex(1024);
            client.write_all(payload).await.unwrap();
            drop(client);
            let request = TransferRequest {
                kind,
                target: &resolved,
                restart_offset: None,
            };
            let status = run_transfer(
                &mut server,
                &fs,
                &request,
                &fast_policy(3),
                Duration::from_millis(500),
            )
            .await;
            assert!(matches!(status, TransferStatus::Complete));
        }

        let stored = std::fs::read(dir.path().join("upload.txt")).unwrap();
        assert_eq!(stored, b"first second");
    }

    #[tokio::test]
    async fn test_store_ends_on_receive_timeout() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, "quiet.txt");
        let (mut server, mut client) = duplex(1024);
        client.write_all(b"partial").await.unwrap();
        let request = TransferRequest {
            kind: TransferKind::Store,
            target: &resolved,
            restart_offset: None,
        };

        let status = run_transfer(
            &mut server,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(status, TransferStatus::Complete));
        assert_eq!(std::fs::read(dir.path().join("quiet.txt")).unwrap(), b"partial");
        drop(client);
    }

    #[tokio::test]
    async fn test_store_with_restart_overwrites_from_offset() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resume.txt"), b"0123456789").unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, "resume.txt");
        let (mut server, mut client) = duplex(1024);
        client.write_all(b"ab").await.unwrap();
        drop(client);
        let request = TransferRequest {
            kind: TransferKind::Store,
            target: &resolved,
            restart_offset: Some(4),
        };

        let status = run_transfer(
            &mut server,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(500),
        )
        .await;
        assert!(matches!(status, TransferStatus::Complete));
        assert_eq!(std::fs::read(dir.path().join("resume.txt")).unwrap(), b"0123ab6789");
    }

    #[tokio::test]
    async fn test_listing_rides_out_transient_failures() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, ".");
        let request = TransferRequest {
            kind: TransferKind::NameList,
            target: &resolved,
            restart_offset: None,
        };

        let mut channel = ScriptedWriter::new(vec![Step::Fail(ErrorKind::WouldBlock); 3]);
        let status = run_transfer(
            &mut channel,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::Complete));
        assert_eq!(channel.written, b"a.txt\r\n");

        let mut channel = ScriptedWriter::new(vec![Step::Fail(ErrorKind::WouldBlock); 4]);
        let status = run_transfer(
            &mut channel,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::Aborted));
        assert!(channel.written.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_aborts_when_retries_run_out() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"payload").unwrap();
        let fs = LocalFileSystem::default();
        let resolved = target(&dir, "data.bin");
        let request = TransferRequest {
            kind: TransferKind::Retrieve,
            target: &resolved,
            restart_offset: None,
        };

        let mut channel = ScriptedWriter::new(vec![
            Step::Accept(3),
            Step::Fail(ErrorKind::TimedOut),
            Step::Fail(ErrorKind::TimedOut),
            Step::Fail(ErrorKind::TimedOut),
        ]);
        let status = run_transfer(
            &mut channel,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::Complete));
        assert_eq!(channel.written, b"payload");

        let mut channel = ScriptedWriter::new(vec![Step::Fail(ErrorKind::Interrupted); 4]);
        let status = run_transfer(
            &mut channel,
            &fs,
            &request,
            &fast_policy(3),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(status, TransferStatus::Aborted));
    }

    #[tokio::test]
    async fn test_active_mode_is_refused_over_tls() {
        let dir = TempDir::new().unwrap();
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_file = dir.path().join("cert.pem");
        let key_file = dir.path().join("key.pem");
        std::fs::write(&cert_file, cert.pem()).unwrap();
        std::fs::write(&key_file, key_pair.serialize_pem()).unwrap();

        let mut config = Config::default();
        config.tls = TlsConfig {
            enabled: true,
            cert_file,
            key_file,
        };
        let server = ServerContext::new(
            config,
            Arc::new(NoUsers),
            Arc::new(LocalFileSystem::default()),
        )
        .unwrap();
        assert!(server.tls.is_some());

        let client = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut session = Session::new(989);
        session.data_endpoint = match client.local_addr().unwrap() {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(addr) => panic!("unexpected address {}", addr),
        };

        let result = open_data_channel(&server, &session).await;
        assert!(matches!(result, Err(FtpError::ActiveModeOverTls)));
        assert!(timeout(Duration::from_millis(100), client.accept())
            .await
            .is_err());
    }
}
