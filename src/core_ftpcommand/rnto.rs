use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::{to_fs_path, ResolvedPath};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{Session, SessionState};
use log::{error, info};
use tokio::io::AsyncWrite;

/// Forgets a staged rename and returns to the logged-in state.
pub fn clear_rename(session: &mut Session) {
    session.rename_from = None;
    session.state = SessionState::LoggedIn;
}

/// Handles the RNTO FTP command.
///
/// Renames the source staged by RNFR to `target`. Whatever the outcome the
/// staged source is consumed.
pub async fn handle_rnto_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    target: &ResolvedPath,
) -> Result<(), FtpError> {
    let source = session.rename_from.take();
    clear_rename(session);

    let source = match source {
        Some(source) => source,
        None => return send_reply(writer, &server.retry, Reply::CmdBadSequence, None).await,
    };

    let separator = server.fs.separator();
    let from = to_fs_path(&source.absolute_path, separator);
    let to = to_fs_path(&target.absolute_path, separator);

    match server.fs.rename(&from, &to).await {
        Ok(()) => {
            info!("Renamed {} to {}", source.virtual_path, target.virtual_path);
            send_reply(writer, &server.retry, Reply::ActionComplete, None).await
        }
        Err(e) => {
            error!(
                "Failed to rename {} to {}: {}",
                source.virtual_path, target.virtual_path, e
            );
            let message = fill(Reply::NotFound, &source.virtual_path);
            send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
        }
    }
}
