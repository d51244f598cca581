use crate::core_error::FtpError;
use crate::core_ftpcommand::transfer::run_data_transfer;
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::core_network::dtp::TransferKind;
use crate::server::ServerContext;
use crate::session::Session;
use tokio::io::AsyncWrite;

/// Handles the RETR FTP command.
pub async fn handle_retr_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    target: ResolvedPath,
) -> Result<(), FtpError> {
    run_data_transfer(writer, server, session, TransferKind::Retrieve, target).await
}
