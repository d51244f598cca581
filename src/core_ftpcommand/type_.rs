use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::utils::find_arg;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::{FileStructure, RepresentationType, Session, TransferMode};
use log::{debug, warn};
use tokio::io::AsyncWrite;

/// Decision for a TYPE argument: the representation to switch to, or the
/// refusal to send.
fn parse_type(args: &str) -> Result<RepresentationType, Reply> {
    let (code, rest) = find_arg(args);
    let (format, _) = find_arg(rest);

    match code.to_ascii_uppercase().as_str() {
        "A" => match format.to_ascii_uppercase().as_str() {
            "" | "N" => Ok(RepresentationType::AsciiNonPrint),
            "T" | "C" => Err(Reply::ParmNoSupport),
            _ => Err(Reply::ParmSyntaxErr),
        },
        "I" => Ok(RepresentationType::Image),
        "E" | "L" => Err(Reply::ParmNoSupport),
        _ => Err(Reply::ParmSyntaxErr),
    }
}

/// Handles the TYPE FTP command.
///
/// ASCII non-print and image are accepted. EBCDIC, local byte size and the
/// Telnet/carriage-control formats are recognized but not supported.
///
/// # Arguments
///
/// * `writer` - The control channel.
/// * `server` - The shared server context.
/// * `session` - The session whose representation type changes.
/// * `args` - The type code, optionally followed by a format code.
pub async fn handle_type_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    match parse_type(args) {
        Ok(type_) => {
            debug!("Representation type set to {:?}", type_);
            session.type_ = type_;
            send_reply(writer, &server.retry, Reply::Okay, None).await
        }
        Err(reply) => {
            warn!("TYPE {:?} refused", args);
            send_reply(writer, &server.retry, reply, None).await
        }
    }
}

fn parse_mode(args: &str) -> Result<TransferMode, Reply> {
    match find_arg(args).0.to_ascii_uppercase().as_str() {
        "S" => Ok(TransferMode::Stream),
        "B" | "C" => Err(Reply::ParmNoSupport),
        _ => Err(Reply::ParmSyntaxErr),
    }
}

/// Handles the MODE FTP command. Only stream mode is supported.
pub async fn handle_mode_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    match parse_mode(args) {
        Ok(mode) => {
            session.mode = mode;
            send_reply(writer, &server.retry, Reply::Okay, None).await
        }
        Err(reply) => send_reply(writer, &server.retry, reply, None).await,
    }
}

fn parse_stru(args: &str) -> Result<FileStructure, Reply> {
    match find_arg(args).0.to_ascii_uppercase().as_str() {
        "F" => Ok(FileStructure::File),
        "R" | "P" => Err(Reply::ParmNoSupport),
        _ => Err(Reply::ParmSyntaxErr),
    }
}

/// Handles the STRU FTP command. Only file structure is supported.
pub async fn handle_stru_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    match parse_stru(args) {
        Ok(structure) => {
            session.structure = structure;
            send_reply(writer, &server.retry, Reply::Okay, None).await
        }
        Err(reply) => send_reply(writer, &server.retry, reply, None).await,
    }
}
