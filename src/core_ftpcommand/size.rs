use crate::core_error::FtpError;
use crate::core_fs::EntryAttributes;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use tokio::io::AsyncWrite;

/// Handles the SIZE FTP command with the size probed by the existence check.
pub async fn handle_size_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    target: &ResolvedPath,
    attributes: Option<EntryAttributes>,
) -> Result<(), FtpError> {
    match attributes {
        Some(attributes) => {
            let message = format!("{} {}", Reply::FileStatus.code(), attributes.size);
            send_reply(writer, &server.retry, Reply::FileStatus, Some(&message)).await
        }
        None => {
            let message = fill(Reply::NotFound, &target.virtual_path);
            send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
        }
    }
}
