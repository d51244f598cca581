// PBSZ and PROT are acknowledged only; the data channel protection follows
// the server's TLS mode whatever the client asks for.
use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::find_arg;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use tokio::io::AsyncWrite;

pub async fn handle_pbsz_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    args: &str,
) -> Result<(), FtpError> {
    acknowledge(writer, server, Reply::Pbsz, args).await
}

pub async fn handle_prot_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    args: &str,
) -> Result<(), FtpError> {
    acknowledge(writer, server, Reply::Prot, args).await
}

async fn acknowledge(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    reply: Reply,
    args: &str,
) -> Result<(), FtpError> {
    let (value, _) = find_arg(args);
    if value.is_empty() {
        return send_reply(writer, &server.retry, Reply::ParmSyntaxErr, None).await;
    }
    let message = fill(reply, value);
    send_reply(writer, &server.retry, reply, Some(&message)).await
}
