use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{RenameSource, Session, SessionState};
use log::debug;
use tokio::io::AsyncWrite;

/// Handles the RNFR FTP command: stages the rename source for RNTO.
pub async fn handle_rnfr_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    target: ResolvedPath,
) -> Result<(), FtpError> {
    debug!("Rename source staged: {}", target.virtual_path);
    session.rename_from = Some(RenameSource {
        absolute_path: target.absolute_path,
        virtual_path: target.virtual_path,
    });
    session.state = SessionState::GotRenameFrom;
    send_reply(writer, &server.retry, Reply::NeedMoreInfo, None).await
}
