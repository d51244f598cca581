use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::{find_arg, truncate_to};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{Session, SessionState};
use log::{info, warn};
use tokio::io::AsyncWrite;

/// Handles the USER FTP command.
///
/// Stages the user name for the following PASS and asks for the password.
/// A USER while logged in starts a new login.
///
/// # Arguments
///
/// * `writer` - The control channel.
/// * `server` - The shared server context.
/// * `session` - The session issuing the command.
/// * `args` - The user name.
///
/// # Returns
///
/// Result<(), FtpError> indicating whether the reply could be sent.
pub async fn handle_user_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    let (username, _) = find_arg(args);
    if username.is_empty() {
        warn!("USER without a user name");
        return send_reply(writer, &server.retry, Reply::ParmSyntaxErr, None).await;
    }

    session.user = truncate_to(username, server.config.limits.user_len_max).to_string();
    session.password.clear();
    session.state = SessionState::GotUser;
    info!("Received USER command with username: {}", session.user);

    send_reply(writer, &server.retry, Reply::NeedPassword, None).await
}
