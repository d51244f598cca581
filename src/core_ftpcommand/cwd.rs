use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::Session;
use log::info;
use tokio::io::AsyncWrite;

/// Handles the PWD FTP command; `target` is the working directory itself.
pub async fn handle_pwd_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    target: &ResolvedPath,
) -> Result<(), FtpError> {
    let message = format!(
        "{} \"{}\" is current directory.",
        Reply::PathName.code(),
        target.virtual_path
    );
    send_reply(writer, &server.retry, Reply::PathName, Some(&message)).await
}

/// Handles the CWD and CDUP FTP commands.
///
/// The target directory has already been checked; it becomes the session's
/// working directory.
pub async fn handle_cwd_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    target: ResolvedPath,
) -> Result<(), FtpError> {
    info!("Changed directory to {}", target.virtual_path);
    session.current_dir = target.virtual_path;
    send_reply(writer, &server.retry, Reply::ActionComplete, None).await
}
