use crate::session::SessionState;

#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    NOOP,
    QUIT,
    REIN,
    SYST,
    FEAT,
    HELP,
    USER,
    PASS,
    MODE,
    TYPE,
    STRU,
    PASV,
    PORT,
    PWD,
    CWD,
    CDUP,
    MKD,
    RMD,
    NLST,
    LIST,
    RETR,
    STOR,
    APPE,
    REST,
    DELE,
    RNFR,
    RNTO,
    SIZE,
    MDTM,
    PBSZ,
    PROT,
    /// End-of-table marker, never dispatched.
    MAX,
}

const ON: bool = true;
const OFF: bool = false;

struct CommandEntry {
    command: FtpCommand,
    token: &'static str,
    // LoggedOut, LoggedIn, GotUser, GotRenameFrom, GotRestartOffset
    allowed: [bool; SessionState::COUNT],
}

const fn entry(
    command: FtpCommand,
    token: &'static str,
    allowed: [bool; SessionState::COUNT],
) -> CommandEntry {
    CommandEntry {
        command,
        token,
        allowed,
    }
}

static COMMANDS: [CommandEntry; 32] = [
    entry(FtpCommand::NOOP, "NOOP", [ON, ON, ON, ON, ON]),
    entry(FtpCommand::QUIT, "QUIT", [ON, ON, ON, ON, ON]),
    entry(FtpCommand::REIN, "REIN", [ON, ON, ON, ON, ON]),
    entry(FtpCommand::SYST, "SYST", [ON, ON, ON, ON, ON]),
    entry(FtpCommand::FEAT, "FEAT", [ON, ON, ON, ON, ON]),
    entry(FtpCommand::HELP, "HELP", [ON, ON, ON, ON, ON]),
    entry(FtpCommand::USER, "USER", [ON, ON, OFF, OFF, OFF]),
    entry(FtpCommand::PASS, "PASS", [OFF, OFF, ON, OFF, OFF]),
    entry(FtpCommand::MODE, "MODE", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::TYPE, "TYPE", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::STRU, "STRU", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::PASV, "PASV", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::PORT, "PORT", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::PWD, "PWD", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::CWD, "CWD", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::CDUP, "CDUP", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::MKD, "MKD", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::RMD, "RMD", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::NLST, "NLST", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::LIST, "LIST", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::RETR, "RETR", [OFF, ON, OFF, OFF, ON]),
    entry(FtpCommand::STOR, "STOR", [OFF, ON, OFF, OFF, ON]),
    entry(FtpCommand::APPE, "APPE", [OFF, ON, OFF, OFF, ON]),
    entry(FtpCommand::REST, "REST", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::DELE, "DELE", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::RNFR, "RNFR", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::RNTO, "RNTO", [OFF, OFF, OFF, ON, OFF]),
    entry(FtpCommand::SIZE, "SIZE", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::MDTM, "MDTM", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::PBSZ, "PBSZ", [OFF, ON, OFF, OFF, OFF]),
    entry(FtpCommand::PROT, "PROT", [OFF, ON, OFF, OFF, OFF]),
    // Must stay last.
    entry(FtpCommand::MAX, "MAX", [OFF, OFF, OFF, OFF, OFF]),
];

impl FtpCommand {
    /// Exact match of an already upper-cased command word.
    pub fn lookup(token: &str) -> Option<FtpCommand> {
        COMMANDS
            .iter()
            .take_while(|e| e.command != FtpCommand::MAX)
            .find(|e| e.token == token)
            .map(|e| e.command)
    }

    pub fn is_allowed(self, state: SessionState) -> bool {
        COMMANDS
            .iter()
            .find(|e| e.command == self)
            .map(|e| e.allowed[state.index()])
            .unwrap_or(false)
    }

    pub fn as_str(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|e| e.command == self)
            .map(|e| e.token)
            .unwrap_or("MAX")
    }

    /// Commands that open a data connection.
    pub fn is_transfer(self) -> bool {
        matches!(
            self,
            FtpCommand::NLST
                | FtpCommand::LIST
                | FtpCommand::RETR
                | FtpCommand::STOR
                | FtpCommand::APPE
        )
    }
}
