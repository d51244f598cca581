use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::{to_fs_path, ResolvedPath};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use log::{error, info};
use tokio::io::AsyncWrite;

/// Handles the MKD (Make Directory) FTP command.
///
/// # Arguments
///
/// * `writer` - The control channel.
/// * `server` - The shared server context.
/// * `target` - The directory to create, known not to exist as a file.
pub async fn handle_mkd_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    target: &ResolvedPath,
) -> Result<(), FtpError> {
    let path = to_fs_path(&target.absolute_path, server.fs.separator());
    match server.fs.create_dir(&path).await {
        Ok(()) => {
            info!("Directory created: {}", target.virtual_path);
            let message = fill(Reply::PathName, &target.virtual_path);
            send_reply(writer, &server.retry, Reply::PathName, Some(&message)).await
        }
        Err(e) => {
            error!("Failed to create directory {}: {}", target.virtual_path, e);
            let message = fill(Reply::NotFound, &target.virtual_path);
            send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
        }
    }
}
