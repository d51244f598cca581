use crate::constants::{MDTM_TIMESTAMP_FORMAT, MDTM_TIMESTAMP_LEN};
use crate::core_error::FtpError;
use crate::core_fs::EntryAttributes;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::{find_arg, find_file_name, to_fs_path, ResolvedPath};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use chrono::NaiveDateTime;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::AsyncWrite;

static TIMESTAMP_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!(r"^\d{{{}}}$", MDTM_TIMESTAMP_LEN)).ok());

fn is_timestamp(token: &str) -> bool {
    TIMESTAMP_RE
        .as_ref()
        .map_or(false, |re| re.is_match(token))
}

/// Splits MDTM arguments into an optional timestamp and the file name.
///
/// A first token of exactly 14 digits followed by a file name is the
/// timestamp of a set request; anything else is the file name of a get.
pub fn split_mdtm_args(args: &str) -> (Option<&str>, &str) {
    let (first, rest) = find_arg(args);
    let name = find_file_name(rest);
    if is_timestamp(first) && !name.is_empty() {
        (Some(first), name)
    } else {
        (None, find_file_name(args))
    }
}

/// Handles the MDTM FTP command, in its get and set forms.
///
/// # Arguments
///
/// * `writer` - The control channel.
/// * `server` - The shared server context.
/// * `target` - The file, known to exist.
/// * `attributes` - The file's attributes, probed by the existence check.
/// * `timestamp` - `YYYYMMDDHHMMSS` (UTC) to set, or `None` to report.
pub async fn handle_mdtm_command(
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    target: &ResolvedPath,
    attributes: Option<EntryAttributes>,
    timestamp: Option<&str>,
) -> Result<(), FtpError> {
    let timestamp = match timestamp {
        Some(timestamp) => timestamp,
        None => {
            return match attributes {
                Some(attributes) => {
                    let message = format!(
                        "{} {}",
                        Reply::FileStatus.code(),
                        attributes.modified.format(MDTM_TIMESTAMP_FORMAT)
                    );
                    send_reply(writer, &server.retry, Reply::FileStatus, Some(&message)).await
                }
                None => {
                    let message = fill(Reply::NotFound, &target.virtual_path);
                    send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
                }
            };
        }
    };

    let time = match NaiveDateTime::parse_from_str(timestamp, MDTM_TIMESTAMP_FORMAT) {
        Ok(time) => time,
        Err(e) => {
            warn!("Invalid MDTM timestamp {}: {}", timestamp, e);
            return send_reply(writer, &server.retry, Reply::ParmSyntaxErr, None).await;
        }
    };

    let path = to_fs_path(&target.absolute_path, server.fs.separator());
    match server.fs.set_modified(&path, time).await {
        Ok(()) => {
            info!("Modification time of {} set to {}", target.virtual_path, time);
            send_reply(writer, &server.retry, Reply::ActionComplete, None).await
        }
        Err(e) => {
            error!("Failed to set modification time of {}: {}", target.virtual_path, e);
            let message = fill(Reply::NotFound, &target.virtual_path);
            send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await
        }
    }
}
