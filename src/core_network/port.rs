use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::Reply;
use crate::core_network::pasv::stop_passive_mode;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::Session;
use log::{info, warn};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::AsyncWrite;

/// Parses the `a,b,c,d,p1,p2` argument of PORT.
///
/// Anything that is not a digit separates fields, so `127,0,0,1,200,0` and
/// `(127 0 0 1 200 0)` parse alike. Returns `None` when fewer than six
/// fields are present or a field does not fit in a byte.
pub fn parse_port_args(args: &str) -> Option<SocketAddrV4> {
    let mut fields = args
        .split(|c: char| !c.is_ascii_digit())
        .filter(|f| !f.is_empty())
        .map(|f| f.parse::<u8>());

    let mut bytes = [0u8; 6];
    for byte in bytes.iter_mut() {
        *byte = fields.next()?.ok()?;
    }

    let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from_be_bytes([bytes[4], bytes[5]]);
    Some(SocketAddrV4::new(ip, port))
}

/// Handles the PORT FTP command.
///
/// Leaves passive mode and records the client's endpoint for the next
/// active-mode transfer.
pub async fn handle_port_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    stop_passive_mode(session);

    match parse_port_args(args) {
        Some(endpoint) => {
            info!("Active mode data endpoint set to {}", endpoint);
            session.data_endpoint = endpoint;
            send_reply(writer, &server.retry, Reply::Okay, None).await
        }
        None => {
            warn!("Malformed PORT argument {:?}", args);
            send_reply(writer, &server.retry, Reply::ParmSyntaxErr, None).await
        }
    }
}
