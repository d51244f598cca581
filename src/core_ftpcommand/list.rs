use crate::core_error::FtpError;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::transfer::run_data_transfer;
use crate::core_ftpcommand::utils::ResolvedPath;
use crate::core_network::dtp::TransferKind;
use crate::server::ServerContext;
use crate::session::Session;
use tokio::io::AsyncWrite;

/// Handles the LIST and NLST FTP commands.
///
/// LIST sends `ls -l` style lines and hides dot entries; NLST sends bare
/// names, hidden ones included.
pub async fn handle_list_command(
    cmd: FtpCommand,
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    target: ResolvedPath,
) -> Result<(), FtpError> {
    let kind = if cmd == FtpCommand::NLST {
        TransferKind::NameList
    } else {
        TransferKind::List
    };
    run_data_transfer(writer, server, session, kind, target).await
}
