use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_network::pasv::stop_passive_mode;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::Session;
use log::info;
use tokio::io::AsyncWrite;

/// Handles the QUIT FTP command.
///
/// Replies 221; the control loop ends the session afterwards.
pub async fn handle_quit_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
) -> Result<(), FtpError> {
    info!("Received QUIT command. Closing connection.");
    stop_passive_mode(session);
    send_reply(writer, &server.retry, Reply::ServerClosing, None).await
}

/// Handles the REIN FTP command: back to a freshly connected session.
pub async fn handle_rein_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
) -> Result<(), FtpError> {
    info!("Reinitializing session of user {}", session.user);
    session.reinitialize();
    send_reply(writer, &server.retry, Reply::ServerReady, None).await
}
