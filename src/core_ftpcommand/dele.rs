use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::{to_fs_path, ResolvedPath};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use log::{error, info};
use tokio::io::AsyncWrite;

/// Handles the DELE FTP command.
///
/// Only the parent directory has been checked, so a missing file surfaces
/// here as a failed removal.
pub async fn handle_dele_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    target: &ResolvedPath,
) -> Result<(), FtpError> {
    let path = to_fs_path(&target.absolute_path, server.fs.separator());
    match server.fs.remove_file(&path).await {
        Ok(()) => {
            info!("File deleted: {}", target.virtual_path);
            send_reply(writer, &server.retry, Reply::ActionComplete, None).await
        }
        Err(e) => {
            error!("Failed to delete {}: {}", target.virtual_path, e);
            let message = fill(Reply::NotFound, &target.virtual_path);
            send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
        }
    }
}
