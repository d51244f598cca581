use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::core_network::dtp::{self, TransferKind, TransferRequest, TransferStatus};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{Session, SessionState};
use log::{info, warn};
use tokio::io::AsyncWrite;

/// Final control reply for a finished data transfer.
fn status_reply(status: &TransferStatus, target: &ResolvedPath) -> (Reply, Option<String>) {
    match status {
        TransferStatus::Complete => (Reply::ClosingSuccess, None),
        TransferStatus::NoConnection(e @ FtpError::ActiveModeOverTls) => {
            (Reply::ClosedConnAbort, Some(e.to_ftp_response()))
        }
        TransferStatus::NoConnection(_) | TransferStatus::Aborted => (Reply::ClosedConnAbort, None),
        TransferStatus::OpenFailed => (
            Reply::ActionAborted,
            Some(format!(
                "{} Cannot open {}: access denied.",
                Reply::ActionAborted.code(),
                target.virtual_path
            )),
        ),
        TransferStatus::SeekFailed(offset) => (
            Reply::ActionAborted,
            Some(format!(
                "{} Cannot seek file {} to offset {}.",
                Reply::ActionAborted.code(),
                target.virtual_path,
                offset
            )),
        ),
    }
}

/// Announces, runs and concludes one data transfer on `target`.
///
/// A restart offset staged by REST applies to this transfer and is consumed
/// by it, whatever the outcome.
pub async fn run_data_transfer(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    kind: TransferKind,
    target: ResolvedPath,
) -> Result<(), FtpError> {
    let restart_offset = match session.state {
        SessionState::GotRestartOffset => Some(session.restart_offset),
        _ => None,
    };

    if let Err(e) = send_reply(writer, &server.retry, Reply::OkayOpening, None).await {
        session.finish_transfer();
        return Err(e);
    }

    let request = TransferRequest {
        kind,
        target: &target,
        restart_offset,
    };
    let status = dtp::execute(server, session, request).await;
    session.finish_transfer();

    match &status {
        TransferStatus::Complete => info!("Transfer of {} complete", target.virtual_path),
        other => warn!("Transfer of {} failed: {:?}", target.virtual_path, other),
    }

    let (reply, message) = status_reply(&status, &target);
    send_reply(writer, &server.retry, reply, message.as_deref()).await
}
