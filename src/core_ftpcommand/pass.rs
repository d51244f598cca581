use crate::core_auth::AuthOutcome;
use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::{find_arg, truncate_to};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{Session, SessionState};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// Handles the PASS FTP command.
///
/// Hands the staged user name and this password to the authenticator. On
/// success the session is sandboxed to the returned base path and starts in
/// the returned initial directory; on failure it is logged out again.
pub async fn handle_pass_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    let (password, _) = find_arg(args);
    if password.is_empty() {
        warn!("PASS without a password for user {}", session.user);
        return send_reply(writer, &server.retry, Reply::ParmSyntaxErr, None).await;
    }

    session.password = truncate_to(password, server.config.limits.pass_len_max).to_string();

    // Password hashing is CPU bound.
    let authenticator = Arc::clone(&server.authenticator);
    let (user, secret) = (session.user.clone(), session.password.clone());
    let task = tokio::task::spawn_blocking(move || authenticator.authenticate(&user, &secret));
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Authentication task for user {} failed: {}", session.user, e);
            AuthOutcome::Denied
        }
    };

    match outcome {
        AuthOutcome::Granted {
            base_path,
            initial_path,
        } => {
            info!("User {} logged in, base path {}", session.user, base_path);
            session.base_path = base_path;
            session.current_dir = initial_path;
            session.state = SessionState::LoggedIn;
            send_reply(writer, &server.retry, Reply::LoggedIn, None).await
        }
        AuthOutcome::Denied => {
            warn!("Login failed for user {}", session.user);
            session.password.clear();
            session.state = SessionState::LoggedOut;
            send_reply(writer, &server.retry, Reply::NotLoggedIn, None).await
        }
    }
}
