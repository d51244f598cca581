use crate::constants::ROOT_PATH;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::net::TcpListener;

/// Control-channel state. Which commands are accepted in which state is
/// decided by `FtpCommand::is_allowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
    GotUser,
    GotRenameFrom,
    GotRestartOffset,
}

impl SessionState {
    pub const COUNT: usize = 5;

    /// Column of this state in the command table.
    pub fn index(self) -> usize {
        match self {
            SessionState::LoggedOut => 0,
            SessionState::LoggedIn => 1,
            SessionState::GotUser => 2,
            SessionState::GotRenameFrom => 3,
            SessionState::GotRestartOffset => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepresentationType {
    AsciiNonPrint,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStructure {
    File,
}

/// Source of a pending rename, staged by RNFR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSource {
    pub absolute_path: String,
    pub virtual_path: String,
}

/// Per-connection protocol state. Owned by the session task; nothing else
/// touches it.
#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    pub user: String,
    pub password: String,
    /// Sandbox root, set by the authenticator at PASS.
    pub base_path: String,
    /// Client-visible working directory.
    pub current_dir: String,
    pub rename_from: Option<RenameSource>,
    pub mode: TransferMode,
    pub type_: RepresentationType,
    pub structure: FileStructure,
    pub data_endpoint: SocketAddrV4,
    pub passive_listener: Option<TcpListener>,
    pub restart_offset: u64,
    default_data_port: u16,
}

impl Session {
    pub fn new(default_data_port: u16) -> Self {
        Self {
            state: SessionState::LoggedOut,
            user: String::new(),
            password: String::new(),
            base_path: String::from(ROOT_PATH),
            current_dir: String::from(ROOT_PATH),
            rename_from: None,
            mode: TransferMode::Stream,
            type_: RepresentationType::AsciiNonPrint,
            structure: FileStructure::File,
            data_endpoint: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, default_data_port),
            passive_listener: None,
            restart_offset: 0,
            default_data_port,
        }
    }

    pub fn is_passive(&self) -> bool {
        self.passive_listener.is_some()
    }

    /// Back to the state of a fresh connection (REIN). Any passive listener
    /// is closed.
    pub fn reinitialize(&mut self) {
        *self = Session::new(self.default_data_port);
    }

    /// Clears the per-transfer fields once a data transfer ends.
    pub fn finish_transfer(&mut self) {
        self.restart_offset = 0;
        self.state = SessionState::LoggedIn;
    }
}
