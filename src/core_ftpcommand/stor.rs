use crate::core_error::FtpError;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::transfer::run_data_transfer;
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::core_network::dtp::TransferKind;
use crate::server::ServerContext;
use crate::session::Session;
use tokio::io::AsyncWrite;

/// Handles the STOR and APPE FTP commands.
///
/// STOR truncates unless a restart offset is pending; APPE never does.
pub async fn handle_stor_command(
    cmd: FtpCommand,
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    target: ResolvedPath,
) -> Result<(), FtpError> {
    let kind = if cmd == FtpCommand::APPE {
        TransferKind::Append
    } else {
        TransferKind::Store
    };
    run_data_transfer(writer, server, session, kind, target).await
}
