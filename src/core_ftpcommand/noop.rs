use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use tokio::io::AsyncWrite;

pub async fn handle_noop_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
) -> Result<(), FtpError> {
    send_reply(writer, &server.retry, Reply::Okay, None).await
}
