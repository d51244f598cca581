use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use log::debug;
use tokio::io::AsyncWrite;

/// Handles the SYST (System) FTP command.
///
/// The server always reports itself as a UNIX system with 8-bit bytes.
pub async fn handle_syst_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
) -> Result<(), FtpError> {
    debug!("Responding to SYST command with system type.");
    send_reply(writer, &server.retry, Reply::SystemType, None).await
}
