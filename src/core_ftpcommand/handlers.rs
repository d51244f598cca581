use crate::constants::{CURRENT_PATH, PARENT_PATH};
use crate::core_error::FtpError;
use crate::core_fs::{EntryAttributes, FileSystem, OpenMode};
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::reply::{fill, Reply};
use crate::core_ftpcommand::utils::{find_file_name, resolve_path, to_fs_path, ResolvedPath};
use crate::core_ftpcommand::{
    cwd, dele, feat, list, mdtm, mkd, noop, pass, prot, quit, rest, retr, rmd, rnfr, rnto, size,
    stor, syst, type_, user,
};
use crate::core_network::{pasv, port};
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::Session;
use log::{debug, warn};
use tokio::io::AsyncWrite;

/// What the control loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// How the target of a path command must look before the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// The target opens as a directory.
    Directory,
    /// The directory holding the target opens.
    ParentDirectory,
    /// The target is probed by opening it as a file for reading.
    File {
        /// An existing file fails the command.
        found_fails: bool,
        /// A missing file is fine (the command creates it).
        missing_ok: bool,
    },
}

/// Where a path command takes its path token from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathArgument {
    Fixed(&'static str),
    FileName,
    /// MDTM: an optional timestamp, then the file name.
    Timestamped,
}

/// Declarative description of a command that works on one resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathCommand {
    pub argument: PathArgument,
    pub existence: Existence,
}

const FILE_MUST_EXIST: Existence = Existence::File {
    found_fails: false,
    missing_ok: false,
};

impl PathCommand {
    const fn new(argument: PathArgument, existence: Existence) -> Self {
        Self {
            argument,
            existence,
        }
    }

    /// Descriptor for `cmd`, or `None` when `cmd` is not a path command.
    pub fn for_command(cmd: FtpCommand) -> Option<PathCommand> {
        use Existence::*;
        use PathArgument::*;

        let desc = match cmd {
            FtpCommand::PWD => Self::new(Fixed(CURRENT_PATH), Directory),
            FtpCommand::CDUP => Self::new(Fixed(PARENT_PATH), Directory),
            FtpCommand::CWD | FtpCommand::RMD | FtpCommand::NLST | FtpCommand::LIST => {
                Self::new(FileName, Directory)
            }
            FtpCommand::DELE => Self::new(FileName, ParentDirectory),
            FtpCommand::MKD | FtpCommand::APPE | FtpCommand::RNTO => Self::new(
                FileName,
                File {
                    found_fails: true,
                    missing_ok: true,
                },
            ),
            FtpCommand::STOR => Self::new(
                FileName,
                File {
                    found_fails: false,
                    missing_ok: true,
                },
            ),
            FtpCommand::RETR | FtpCommand::RNFR | FtpCommand::SIZE => {
                Self::new(FileName, FILE_MUST_EXIST)
            }
            FtpCommand::MDTM => Self::new(Timestamped, FILE_MUST_EXIST),
            _ => return None,
        };
        Some(desc)
    }
}

/// Executes an already allowed command.
pub async fn dispatch(
    cmd: FtpCommand,
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<Flow, FtpError> {
    match cmd {
        FtpCommand::NOOP => noop::handle_noop_command(writer, server).await?,
        FtpCommand::QUIT => {
            quit::handle_quit_command(writer, server, session).await?;
            return Ok(Flow::Quit);
        }
        FtpCommand::REIN => quit::handle_rein_command(writer, server, session).await?,
        FtpCommand::SYST => syst::handle_syst_command(writer, server).await?,
        FtpCommand::FEAT => feat::handle_feat_command(writer, server).await?,
        FtpCommand::HELP => feat::handle_help_command(writer, server).await?,
        FtpCommand::USER => user::handle_user_command(writer, server, session, args).await?,
        FtpCommand::PASS => pass::handle_pass_command(writer, server, session, args).await?,
        FtpCommand::TYPE => type_::handle_type_command(writer, server, session, args).await?,
        FtpCommand::MODE => type_::handle_mode_command(writer, server, session, args).await?,
        FtpCommand::STRU => type_::handle_stru_command(writer, server, session, args).await?,
        FtpCommand::PASV => pasv::handle_pasv_command(writer, server, session).await?,
        FtpCommand::PORT => port::handle_port_command(writer, server, session, args).await?,
        FtpCommand::REST => rest::handle_rest_command(writer, server, session, args).await?,
        FtpCommand::PBSZ => prot::handle_pbsz_command(writer, server, args).await?,
        FtpCommand::PROT => prot::handle_prot_command(writer, server, args).await?,
        _ => match PathCommand::for_command(cmd) {
            Some(desc) => handle_path_command(cmd, desc, writer, server, session, args).await?,
            None => send_reply(writer, &server.retry, Reply::CmdNoSupport, None).await?,
        },
    }
    Ok(Flow::Continue)
}

/// Splits the argument of a path command into its optional timestamp and
/// the path token.
fn path_token(argument: PathArgument, args: &str) -> (Option<&str>, &str) {
    let (timestamp, token) = match argument {
        PathArgument::Fixed(token) => return (None, token),
        PathArgument::FileName => (None, find_file_name(args)),
        PathArgument::Timestamped => mdtm::split_mdtm_args(args),
    };

    // Listing options such as `-la` are not paths.
    if token.starts_with('-') {
        (timestamp, CURRENT_PATH)
    } else {
        (timestamp, token)
    }
}

/// Applies an existence policy. `Ok` carries the probed file's attributes
/// when the file was found.
async fn check_existence(
    fs: &dyn FileSystem,
    target: &ResolvedPath,
    existence: Existence,
) -> Result<Option<EntryAttributes>, ()> {
    let separator = fs.separator();
    match existence {
        Existence::Directory => fs
            .open_dir(&to_fs_path(&target.absolute_path, separator))
            .await
            .map(|_| None)
            .map_err(|e| debug!("Directory check failed: {}", e)),
        Existence::ParentDirectory => fs
            .open_dir(&to_fs_path(&target.parent_path, separator))
            .await
            .map(|_| None)
            .map_err(|e| debug!("Parent directory check failed: {}", e)),
        Existence::File {
            found_fails,
            missing_ok,
        } => match fs
            .open_file(&to_fs_path(&target.absolute_path, separator), OpenMode::Read)
            .await
        {
            Ok(file) if !found_fails => Ok(file.attributes().await.ok()),
            Ok(_) => Err(()),
            Err(_) if missing_ok => Ok(None),
            Err(e) => {
                debug!("File check failed: {}", e);
                Err(())
            }
        },
    }
}

/// Drops the sequence state a failed path command would otherwise leave
/// behind.
fn abandon_pending(cmd: FtpCommand, session: &mut Session) {
    match cmd {
        FtpCommand::RNTO => rnto::clear_rename(session),
        cmd if cmd.is_transfer() => session.finish_transfer(),
        _ => {}
    }
}

/// Resolve, check, act: the pipeline shared by every path command.
pub async fn handle_path_command(
    cmd: FtpCommand,
    desc: PathCommand,
    writer: &mut (dyn AsyncWrite + Unpin + Send),
    server: &ServerContext,
    session: &mut Session,
    args: &str,
) -> Result<(), FtpError> {
    let (timestamp, token) = path_token(desc.argument, args);

    if token.len() > server.config.limits.name_len_max {
        warn!(
            "{} argument longer than {} bytes refused",
            cmd.as_str(),
            server.config.limits.name_len_max
        );
        abandon_pending(cmd, session);
        return send_reply(writer, &server.retry, Reply::NameErr, None).await;
    }

    let target = match resolve_path(
        &session.base_path,
        &session.current_dir,
        token,
        server.path_len_max(),
    ) {
        Ok(target) => target,
        Err(e) => {
            warn!("{} {:?} refused: {}", cmd.as_str(), token, e);
            abandon_pending(cmd, session);
            return send_reply(writer, &server.retry, Reply::NameErr, None).await;
        }
    };

    let attributes = match check_existence(server.fs.as_ref(), &target, desc.existence).await {
        Ok(attributes) => attributes,
        Err(()) => {
            abandon_pending(cmd, session);
            let message = fill(Reply::NotFound, &target.virtual_path);
            return send_reply(writer, &server.retry, Reply::NotFound, Some(&message)).await;
        }
    };

    match cmd {
        FtpCommand::PWD => cwd::handle_pwd_command(writer, server, &target).await,
        FtpCommand::CWD | FtpCommand::CDUP => {
            cwd::handle_cwd_command(writer, server, session, target).await
        }
        FtpCommand::MKD => mkd::handle_mkd_command(writer, server, &target).await,
        FtpCommand::RMD => rmd::handle_rmd_command(writer, server, &target).await,
        FtpCommand::DELE => dele::handle_dele_command(writer, server, &target).await,
        FtpCommand::RNFR => rnfr::handle_rnfr_command(writer, server, session, target).await,
        FtpCommand::RNTO => rnto::handle_rnto_command(writer, server, session, &target).await,
        FtpCommand::SIZE => size::handle_size_command(writer, server, &target, attributes).await,
        FtpCommand::MDTM => {
            mdtm::handle_mdtm_command(writer, server, &target, attributes, timestamp).await
        }
        FtpCommand::NLST | FtpCommand::LIST => {
            list::handle_list_command(cmd, writer, server, session, target).await
        }
        FtpCommand::RETR => retr::handle_retr_command(writer, server, session, target).await,
        FtpCommand::STOR | FtpCommand::APPE => {
            stor::handle_stor_command(cmd, writer, server, session, target).await
        }
        _ => send_reply(writer, &server.retry, Reply::CmdNoSupport, None).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_path_command_has_a_descriptor() {
        for cmd in [
            FtpCommand::PWD,
            FtpCommand::CWD,
            FtpCommand::CDUP,
            FtpCommand::MKD,
            FtpCommand::RMD,
            FtpCommand::NLST,
            FtpCommand::LIST,
            FtpCommand::RETR,
            FtpCommand::STOR,
            FtpCommand::APPE,
            FtpCommand::DELE,
            FtpCommand::RNFR,
            FtpCommand::RNTO,
            FtpCommand::SIZE,
            FtpCommand::MDTM,
        ] {
            assert!(PathCommand::for_command(cmd).is_some(), "{:?}", cmd);
        }
        assert!(PathCommand::for_command(FtpCommand::NOOP).is_none());
        assert!(PathCommand::for_command(FtpCommand::PASV).is_none());
    }

    #[test]
    fn test_existence_policies() {
        let dele = PathCommand::for_command(FtpCommand::DELE).unwrap();
        assert_eq!(dele.existence, Existence::ParentDirectory);

        let appe = PathCommand::for_command(FtpCommand::APPE).unwrap();
        assert_eq!(
            appe.existence,
            Existence::File {
                found_fails: true,
                missing_ok: true
            }
        );

        let retr = PathCommand::for_command(FtpCommand::RETR).unwrap();
        assert_eq!(retr.existence, FILE_MUST_EXIST);
    }

    #[test]
    fn test_path_token() {
        assert_eq!(path_token(PathArgument::Fixed(".."), "ignored"), (None, ".."));
        assert_eq!(path_token(PathArgument::FileName, "  my file.txt"), (None, "my file.txt"));
        assert_eq!(path_token(PathArgument::FileName, "-la"), (None, "."));
        assert_eq!(path_token(PathArgument::FileName, ""), (None, ""));
        assert_eq!(
            path_token(PathArgument::Timestamped, "20200517083000 a.txt"),
            (Some("20200517083000"), "a.txt")
        );
        assert_eq!(path_token(PathArgument::Timestamped, "a.txt"), (None, "a.txt"));
    }
}
