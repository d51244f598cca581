use crate::core_error::FtpError;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::handlers::{dispatch, Flow};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::split_command;
use crate::core_network::pasv::stop_passive_mode;
use crate::helpers::{banner_lines, send_reply, send_response};
use crate::server::ServerContext;
use crate::session::{Session, SessionState};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::time::timeout;

/// One read from the control channel.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineRead {
    /// A command line, line terminator stripped.
    Line(String),
    /// No LF within the line limit; the rest of the line was discarded.
    TooLong,
    Closed,
}

/// Reads one LF-terminated line of at most `max` bytes.
pub(crate) async fn read_command_line<R>(reader: &mut R, max: usize) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(max.min(256));
    let n = (&mut *reader).take(max as u64).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(LineRead::Closed);
    }

    if buf.last() != Some(&b'\n') {
        if buf.len() < max {
            // EOF in the middle of a line
            return Ok(LineRead::Closed);
        }
        loop {
            let mut skipped = Vec::new();
            let n = (&mut *reader)
                .take(max as u64)
                .read_until(b'\n', &mut skipped)
                .await?;
            if n == 0 || skipped.last() == Some(&b'\n') {
                break;
            }
        }
        return Ok(LineRead::TooLong);
    }

    let line = String::from_utf8_lossy(&buf);
    Ok(LineRead::Line(
        line.trim_end_matches(|c| c == '\r' || c == '\n').to_string(),
    ))
}

/// Runs one control session to completion over `stream`.
///
/// Sends the greeting, then reads and executes commands in order until QUIT,
/// a control timeout, or the client going away. The passive listener, if
/// any, is closed on the way out.
pub async fn handle_control_connection<S>(stream: S, server: Arc<ServerContext>) -> Result<(), FtpError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut control = BufReader::new(stream);
    let mut session = Session::new(server.config.data_port());

    if let Some(banner) = &server.banner {
        send_response(&mut control, &server.retry, &banner_lines(banner)).await?;
    }
    send_reply(&mut control, &server.retry, Reply::ServerReady, None).await?;
    info!("Session opened");

    let result = command_loop(&mut control, &server, &mut session).await;

    stop_passive_mode(&mut session);
    if let Err(e) = timeout(server.retry.attempt_timeout, control.shutdown()).await {
        debug!("Control channel shutdown timed out: {}", e);
    }
    info!("Session closed for user {:?}", session.user);
    result
}

async fn command_loop<S>(
    control: &mut BufReader<S>,
    server: &ServerContext,
    session: &mut Session,
) -> Result<(), FtpError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let line_max = server.config.limits.ctrl_line_max;

    loop {
        let read = timeout(
            server.config.timeouts.ctrl_rx(),
            read_command_line(control, line_max),
        )
        .await;

        let line = match read {
            Ok(Ok(LineRead::Line(line))) => line,
            Ok(Ok(LineRead::TooLong)) => {
                warn!("Command line longer than {} bytes discarded", line_max);
                send_reply(control, &server.retry, Reply::ParmSyntaxErr, None).await?;
                continue;
            }
            Ok(Ok(LineRead::Closed)) => {
                info!("Client closed the control connection");
                return Ok(());
            }
            Ok(Err(e)) => {
                warn!("Control channel read failed: {}", e);
                close_session(control, server, session).await;
                return Err(FtpError::ControlChannel(e));
            }
            Err(_) => {
                info!("{}", FtpError::ControlTimeout);
                close_session(control, server, session).await;
                return Ok(());
            }
        };

        if execute_line(control, server, session, &line).await? == Flow::Quit {
            return Ok(());
        }
    }
}

async fn close_session<W>(control: &mut W, server: &ServerContext, session: &mut Session)
where
    W: AsyncWrite + Unpin + Send,
{
    stop_passive_mode(session);
    if let Err(e) = send_reply(control, &server.retry, Reply::ServerClosing, None).await {
        debug!("Could not send closing reply: {}", e);
    }
}

/// Looks up, gates and executes one command line.
async fn execute_line<W>(
    control: &mut W,
    server: &ServerContext,
    session: &mut Session,
    line: &str,
) -> Result<Flow, FtpError>
where
    W: AsyncWrite + Unpin + Send,
{
    let (word, args) = split_command(line);
    if word.is_empty() {
        return Ok(Flow::Continue);
    }

    let cmd = match FtpCommand::lookup(&word) {
        Some(cmd) => cmd,
        None => {
            debug!("<< {} (unknown)", word);
            send_reply(control, &server.retry, Reply::CmdNoSupport, None).await?;
            return Ok(Flow::Continue);
        }
    };

    if cmd == FtpCommand::PASS {
        debug!("<< PASS ****");
    } else {
        debug!("<< {}", line);
    }

    if !cmd.is_allowed(session.state) {
        reject_out_of_sequence(control, server, session, cmd).await?;
        return Ok(Flow::Continue);
    }

    dispatch(cmd, control, server, session, args).await
}

/// Refuses a command that the current state does not accept.
///
/// Before login this is a 530. Otherwise 503, and any half-finished
/// sequence is dropped: a pending USER falls back to logged out, a pending
/// RNFR or REST falls back to logged in.
async fn reject_out_of_sequence<W>(
    control: &mut W,
    server: &ServerContext,
    session: &mut Session,
    cmd: FtpCommand,
) -> Result<(), FtpError>
where
    W: AsyncWrite + Unpin + Send,
{
    debug!("{} not allowed in state {:?}", cmd.as_str(), session.state);
    match session.state {
        SessionState::LoggedOut => {
            send_reply(control, &server.retry, Reply::NotLoggedIn, None).await
        }
        SessionState::GotUser => {
            session.state = SessionState::LoggedOut;
            send_reply(control, &server.retry, Reply::CmdBadSequence, None).await
        }
        _ => {
            session.rename_from = None;
            session.restart_offset = 0;
            session.state = SessionState::LoggedIn;
            send_reply(control, &server.retry, Reply::CmdBadSequence, None).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core_auth::{AuthOutcome, Authenticator};
    use crate::core_fs::LocalFileSystem;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{duplex, DuplexStream};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    struct MockAuth {
        base_path: String,
    }

    impl Authenticator for MockAuth {
        fn authenticate(&self, user: &str, password: &str) -> AuthOutcome {
            if user == "DUT" && password == "secret" {
                AuthOutcome::Granted {
                    base_path: self.base_path.clone(),
                    initial_path: "/".to_string(),
                }
            } else {
                AuthOutcome::Denied
            }
        }
    }

    struct Client {
        control: BufReader<DuplexStream>,
        dir: TempDir,
        task: JoinHandle<Result<(), FtpError>>,
    }

    impl Client {
        async fn start(mut config: Config) -> Client {
            config.server.pasv_address = "127.0.0.1".into();
            config.server.pasv_port = 0;
            let dir = TempDir::new().unwrap();
            let auth = MockAuth {
                base_path: dir.path().to_str().unwrap().to_string(),
            };
            let ctx = ServerContext::new(config, Arc::new(auth), Arc::new(LocalFileSystem::default()))
                .unwrap()
                .with_banner(Some("Welcome".into()));
            let (server_end, client_end) = duplex(64 * 1024);
            let task = tokio::spawn(handle_control_connection(server_end, Arc::new(ctx)));

            let mut client = Client {
                control: BufReader::new(client_end),
                dir,
                task,
            };
            assert_eq!(client.reply().await, "220-Welcome\r\n220 Service ready for new user.");
            client
        }

        async fn logged_in() -> Client {
            let mut client = Client::start(Config::default()).await;
            client.login().await;
            client
        }

        async fn login(&mut self) {
            assert!(self.send("USER DUT").await.starts_with("331 "));
            assert!(self.send("PASS secret").await.starts_with("230 "));
        }

        /// Reads one complete reply, multi-line replies included, without
        /// the final CRLF.
        async fn reply(&mut self) -> String {
            let mut text = String::new();
            loop {
                let mut line = String::new();
                let n = timeout(Duration::from_secs(5), self.control.read_line(&mut line))
                    .await
                    .unwrap()
                    .unwrap();
                assert!(n > 0, "control connection closed");
                text.push_str(&line);
                if line.len() >= 4 && line.as_bytes()[3] == b' ' {
                    return text.trim_end().to_string();
                }
            }
        }

        async fn send(&mut self, line: &str) -> String {
            self.control
                .write_all(format!("{}\r\n", line).as_bytes())
                .await
                .unwrap();
            self.reply().await
        }

        async fn pasv(&mut self) -> SocketAddrV4 {
            let reply = self.send("PASV").await;
            assert!(reply.starts_with("227 Entering Passive Mode ("), "{}", reply);
            let start = reply.find('(').unwrap() + 1;
            let end = reply.find(')').unwrap();
            let fields: Vec<u8> = reply[start..end]
                .split(',')
                .map(|f| f.parse().unwrap())
                .collect();
            SocketAddrV4::new(
                Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]),
                u16::from_be_bytes([fields[4], fields[5]]),
            )
        }

        /// Runs a passive download and returns the bytes received.
        async fn download(&mut self, command: &str) -> Vec<u8> {
            let addr = self.pasv().await;
            self.fetch(addr, command).await
        }

        /// Download over an already announced passive endpoint.
        async fn fetch(&mut self, addr: SocketAddrV4, command: &str) -> Vec<u8> {
            assert!(self.send(command).await.starts_with("150 "));
            let mut data = TcpStream::connect(addr).await.unwrap();
            let mut received = Vec::new();
            data.read_to_end(&mut received).await.unwrap();
            assert!(self.reply().await.starts_with("226 "));
            received
        }

        async fn upload(&mut self, command: &str, payload: &[u8]) {
            let addr = self.pasv().await;
            assert!(self.send(command).await.starts_with("150 "));
            let mut data = TcpStream::connect(addr).await.unwrap();
            data.write_all(payload).await.unwrap();
            data.shutdown().await.unwrap();
            drop(data);
            assert!(self.reply().await.starts_with("226 "));
        }

        fn write_file(&self, name: &str, content: &[u8]) {
            std::fs::write(self.dir.path().join(name), content).unwrap();
        }

        fn read_file(&self, name: &str) -> Vec<u8> {
            std::fs::read(self.dir.path().join(name)).unwrap()
        }
    }

    #[tokio::test]
    async fn test_read_command_line() {
        let input: &[u8] = b"NOOP\r\nUSER DUT\n0123456789ABCDEF\nQUIT\r\n";
        let mut reader = BufReader::new(input);

        assert_eq!(
            read_command_line(&mut reader, 12).await.unwrap(),
            LineRead::Line("NOOP".into())
        );
        assert_eq!(
            read_command_line(&mut reader, 12).await.unwrap(),
            LineRead::Line("USER DUT".into())
        );
        assert_eq!(read_command_line(&mut reader, 12).await.unwrap(), LineRead::TooLong);
        assert_eq!(
            read_command_line(&mut reader, 12).await.unwrap(),
            LineRead::Line("QUIT".into())
        );
        assert_eq!(read_command_line(&mut reader, 12).await.unwrap(), LineRead::Closed);
    }

    #[tokio::test]
    async fn test_login_and_commands_before_login() {
        let mut client = Client::start(Config::default()).await;

        assert!(client.send("PWD").await.starts_with("530 "));
        assert!(client.send("PASS secret").await.starts_with("530 "));
        assert!(client.send("XYZZY").await.starts_with("502 "));
        assert!(client.send("NOOP").await.starts_with("200 "));
        assert_eq!(client.send("SYST").await, "215 UNIX Type: L8.");

        assert!(client.send("USER DUT").await.starts_with("331 "));
        assert!(client.send("PASS wrong").await.starts_with("530 "));
        assert!(client.send("PWD").await.starts_with("530 "));

        assert!(client.send("user DUT").await.starts_with("331 "));
        assert!(client.send("pass secret").await.starts_with("230 "));
        assert_eq!(client.send("PWD").await, "257 \"/\" is current directory.");
    }

    #[tokio::test]
    async fn test_out_of_sequence_after_user_does_not_log_in() {
        let mut client = Client::start(Config::default()).await;

        assert!(client.send("USER DUT").await.starts_with("331 "));
        assert!(client.send("LIST").await.starts_with("503 "));
        assert!(client.send("PWD").await.starts_with("530 "));
        assert!(client.send("USER").await.starts_with("501 "));
    }

    #[tokio::test]
    async fn test_cwd_and_pwd() {
        let mut client = Client::logged_in().await;
        std::fs::create_dir(client.dir.path().join("sub")).unwrap();

        assert!(client.send("CWD sub").await.starts_with("250 "));
        assert_eq!(client.send("PWD").await, "257 \"/sub\" is current directory.");
        assert!(client.send("CWD missing").await.starts_with("550 "));
        assert!(client.send("CDUP").await.starts_with("250 "));
        assert_eq!(client.send("PWD").await, "257 \"/\" is current directory.");
        assert!(client.send("CDUP").await.starts_with("250 "));
        assert_eq!(client.send("PWD").await, "257 \"/\" is current directory.");
    }

    #[tokio::test]
    async fn test_escape_attempt_is_refused() {
        let mut client = Client::logged_in().await;

        assert_eq!(
            client.send("CWD ../../etc").await,
            "553 Requested action not taken. File name not allowed."
        );
        assert_eq!(client.send("PWD").await, "257 \"/\" is current directory.");
    }

    #[tokio::test]
    async fn test_over_long_file_name_is_refused() {
        let mut config = Config::default();
        config.limits.name_len_max = 8;
        let mut client = Client::start(config).await;
        client.login().await;

        assert!(client.send("MKD much-too-long").await.starts_with("553 "));
        assert!(!client.dir.path().join("much-too-long").exists());
        assert_eq!(client.send("MKD short").await, "257 \"/short\" created.");
    }

    #[tokio::test]
    async fn test_passive_list_and_nlst() {
        let mut client = Client::logged_in().await;
        client.write_file("readme.txt", b"hello");
        client.write_file(".hidden", b"x");

        let listing = String::from_utf8(client.download("LIST").await).unwrap();
        assert!(listing.contains(" readme.txt\r\n"), "{}", listing);
        assert!(listing.starts_with("-rw-rw-rw-"));
        assert!(!listing.contains(".hidden"));

        let names = String::from_utf8(client.download("NLST -a").await).unwrap();
        assert!(names.contains("readme.txt\r\n"));
        assert!(names.contains(".hidden\r\n"));
    }

    #[tokio::test]
    async fn test_rename_sequence() {
        let mut client = Client::logged_in().await;
        client.write_file("a.txt", b"abc");

        assert!(client.send("RNTO b.txt").await.starts_with("503 "));
        assert!(client.dir.path().join("a.txt").exists());

        assert!(client.send("RNFR a.txt").await.starts_with("350 "));
        assert!(client.send("RNTO b.txt").await.starts_with("250 "));
        assert_eq!(client.read_file("b.txt"), b"abc");
        assert!(!client.dir.path().join("a.txt").exists());

        assert!(client.send("RNFR missing.txt").await.starts_with("550 "));
        assert!(client.send("RNTO c.txt").await.starts_with("503 "));
    }

    #[tokio::test]
    async fn test_restart_offset_is_consumed() {
        let mut client = Client::logged_in().await;
        client.write_file("digits.txt", b"0123456789");

        let addr = client.pasv().await;
        assert!(client.send("REST 3").await.starts_with("350 "));
        assert_eq!(client.fetch(addr, "RETR digits.txt").await, b"3456789");
        assert_eq!(client.download("RETR digits.txt").await, b"0123456789");

        assert!(client.send("REST").await.starts_with("501 "));
        assert!(client.send("REST abc").await.starts_with("501 "));
    }

    #[tokio::test]
    async fn test_retr_missing_file_and_pending_restart() {
        let mut client = Client::logged_in().await;
        client.write_file("small.txt", b"abc");

        assert_eq!(
            client.send("RETR nope.txt").await,
            "550 Requested action not taken. /nope.txt unavailable."
        );

        client.pasv().await;
        assert!(client.send("REST 3").await.starts_with("350 "));
        assert!(client.send("PASV").await.starts_with("503 "));
        assert!(client.send("NOOP").await.starts_with("200 "));
    }

    #[tokio::test]
    async fn test_store_append_size_and_mdtm() {
        let mut client = Client::logged_in().await;

        client.upload("STOR up.txt", b"hello").await;
        assert_eq!(client.read_file("up.txt"), b"hello");
        assert_eq!(client.send("SIZE up.txt").await, "213 5");

        assert!(client.send("APPE up.txt").await.starts_with("550 "));
        client.upload("APPE extra.txt", b"more").await;
        assert_eq!(client.read_file("extra.txt"), b"more");

        assert!(client.send("MDTM 20200517083000 up.txt").await.starts_with("250 "));
        assert_eq!(client.send("MDTM up.txt").await, "213 20200517083000");
        assert!(client.send("MDTM missing.txt").await.starts_with("550 "));
        assert!(client.send("SIZE missing.txt").await.starts_with("550 "));
    }

    #[tokio::test]
    async fn test_directory_commands() {
        let mut client = Client::logged_in().await;
        client.write_file("gone.txt", b"x");

        assert_eq!(client.send("MKD new").await, "257 \"/new\" created.");
        assert_eq!(
            client.send("MKD new").await,
            "550 Requested action not taken. /new unavailable."
        );
        assert!(client.send("RMD new").await.starts_with("250 "));
        assert!(client.send("RMD new").await.starts_with("550 "));

        assert!(client.send("DELE gone.txt").await.starts_with("250 "));
        assert!(!client.dir.path().join("gone.txt").exists());
        assert!(client.send("DELE gone.txt").await.starts_with("550 "));
    }

    #[tokio::test]
    async fn test_representation_commands() {
        let mut client = Client::logged_in().await;

        assert!(client.send("TYPE A").await.starts_with("200 "));
        assert!(client.send("TYPE A N").await.starts_with("200 "));
        assert!(client.send("TYPE A T").await.starts_with("504 "));
        assert!(client.send("TYPE I").await.starts_with("200 "));
        assert!(client.send("TYPE E").await.starts_with("504 "));
        assert!(client.send("TYPE X").await.starts_with("501 "));
        assert!(client.send("MODE S").await.starts_with("200 "));
        assert!(client.send("MODE B").await.starts_with("504 "));
        assert!(client.send("STRU F").await.starts_with("200 "));
        assert!(client.send("STRU R").await.starts_with("504 "));
        assert_eq!(client.send("PBSZ 0").await, "200 PBSZ=0");
        assert_eq!(client.send("PROT P").await, "200 Protection level set to P");

        let feat = client.send("FEAT").await;
        assert!(feat.starts_with("211-"));
        assert!(feat.ends_with("211 End"));
        assert!(client.send("HELP").await.starts_with("214-"));
    }

    #[tokio::test]
    async fn test_active_mode_retrieve() {
        let mut client = Client::logged_in().await;
        client.write_file("active.txt", b"over port");

        assert!(client.send("PORT 1,2,3").await.starts_with("501 "));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let [p1, p2] = listener.local_addr().unwrap().port().to_be_bytes();
        let port = format!("PORT 127,0,0,1,{},{}", p1, p2);
        assert!(client.send(&port).await.starts_with("200 "));

        assert!(client.send("RETR active.txt").await.starts_with("150 "));
        let (mut data, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"over port");
        assert!(client.reply().await.starts_with("226 "));
    }

    #[tokio::test]
    async fn test_active_retrieve_of_missing_file_never_connects() {
        let mut client = Client::logged_in().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let [p1, p2] = listener.local_addr().unwrap().port().to_be_bytes();
        let port = format!("PORT 127,0,0,1,{},{}", p1, p2);
        assert!(client.send(&port).await.starts_with("200 "));

        assert_eq!(
            client.send("RETR missing").await,
            "550 Requested action not taken. /missing unavailable."
        );
        assert!(timeout(Duration::from_millis(200), listener.accept())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_port_closes_passive_listener() {
        let mut client = Client::logged_in().await;
        client.write_file("switch.txt", b"now active");

        let passive = client.pasv().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let [p1, p2] = listener.local_addr().unwrap().port().to_be_bytes();
        let port = format!("PORT 127,0,0,1,{},{}", p1, p2);
        assert!(client.send(&port).await.starts_with("200 "));

        let refused = TcpStream::connect(passive).await.unwrap_err();
        assert_eq!(refused.kind(), std::io::ErrorKind::ConnectionRefused);

        assert!(client.send("RETR switch.txt").await.starts_with("150 "));
        let (mut data, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"now active");
        assert!(client.reply().await.starts_with("226 "));
    }

    #[tokio::test]
    async fn test_over_long_line_is_discarded() {
        let mut config = Config::default();
        config.limits.ctrl_line_max = 32;
        let mut client = Client::start(config).await;

        let long = format!("USER {}", "x".repeat(100));
        assert!(client.send(&long).await.starts_with("501 "));
        assert!(client.send("NOOP").await.starts_with("200 "));
    }

    #[tokio::test]
    async fn test_rein_and_quit() {
        let mut client = Client::logged_in().await;

        assert!(client.send("REIN").await.starts_with("220 "));
        assert!(client.send("PWD").await.starts_with("530 "));
        client.login().await;

        assert!(client.send("QUIT").await.starts_with("221 "));
        let result = timeout(Duration::from_secs(5), client.task).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_control_timeout_closes_session() {
        let mut config = Config::default();
        config.timeouts.ctrl_rx_timeout_ms = 50;
        let mut client = Client::start(config).await;

        assert!(client.reply().await.starts_with("221 "));
        let result = timeout(Duration::from_secs(5), client.task).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
