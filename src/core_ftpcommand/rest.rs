use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::find_arg;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{Session, SessionState};
use log::{debug, warn};
use tokio::io::AsyncWrite;

/// Handles the REST FTP command.
///
/// Stages the byte offset at which the next RETR, STOR or APPE starts.
pub async fn handle_rest_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    let (offset, _) = find_arg(args);
    match offset.parse::<u64>() {
        Ok(offset) => {
            debug!("Restart offset set to {}", offset);
            session.restart_offset = offset;
            session.state = SessionState::GotRestartOffset;
            send_reply(writer, &server.retry, Reply::NeedMoreInfo, None).await
        }
        Err(_) => {
            warn!("REST with invalid offset {:?}", offset);
            send_reply(writer, &server.retry, Reply::ParmSyntaxErr, None).await
        }
    }
}
