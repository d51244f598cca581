use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::{to_fs_path, ResolvedPath};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use log::{error, info};
use tokio::io::AsyncWrite;

/// Handles the RMD (Remove Directory) FTP command.
pub async fn handle_rmd_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    target: &ResolvedPath,
) -> Result<(), FtpError> {
    let path = to_fs_path(&target.absolute_path, server.fs.separator());
    match server.fs.remove_dir(&path).await {
        Ok(()) => {
            info!("Directory removed: {}", target.virtual_path);
            send_reply(writer, &server.retry, Reply::ActionComplete, None).await
        }
        Err(e) => {
            error!("Failed to remove directory {}: {}", target.virtual_path, e);
            let message = fill(Reply::NotFound, &target.virtual_path);
            send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
        }
    }
}
