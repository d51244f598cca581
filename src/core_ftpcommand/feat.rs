use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use tokio::io::AsyncWrite;

/// Handles the FEAT FTP command with the multi-line list of extensions.
pub async fn handle_feat_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
) -> Result<(), FtpError> {
    send_reply(writer, &server.retry, Reply::SystemStatus, None).await
}

/// Handles the HELP FTP command. Arguments are ignored.
pub async fn handle_help_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
) -> Result<(), FtpError> {
    send_reply(writer, &server.retry, Reply::HelpMessage, None).await
}
