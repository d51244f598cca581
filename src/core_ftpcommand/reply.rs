// Reply catalog: status code and message template of every reply the server sends.

/// Identifier of a catalog reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    OkayOpening,
    Okay,
    SystemStatus,
    FileStatus,
    HelpMessage,
    SystemType,
    ServerReady,
    ServerClosing,
    ClosingSuccess,
    EnterPasvMode,
    LoggedIn,
    ActionComplete,
    PathName,
    NeedPassword,
    NeedMoreInfo,
    NoService,
    CantOpenData,
    ClosedConnAbort,
    ParmSyntaxErr,
    CmdNoSupport,
    CmdBadSequence,
    ParmNoSupport,
    NotLoggedIn,
    NotFound,
    ActionAborted,
    NameErr,
    Pbsz,
    Prot,
}

impl Reply {
    pub fn code(self) -> u16 {
        match self {
            Reply::OkayOpening => 150,
            Reply::Okay | Reply::Pbsz | Reply::Prot => 200,
            Reply::SystemStatus => 211,
            Reply::FileStatus => 213,
            Reply::HelpMessage => 214,
            Reply::SystemType => 215,
            Reply::ServerReady => 220,
            Reply::ServerClosing => 221,
            Reply::ClosingSuccess => 226,
            Reply::EnterPasvMode => 227,
            Reply::LoggedIn => 230,
            Reply::ActionComplete => 250,
            Reply::PathName => 257,
            Reply::NeedPassword => 331,
            Reply::NeedMoreInfo => 350,
            Reply::NoService => 421,
            Reply::CantOpenData => 425,
            Reply::ClosedConnAbort => 426,
            Reply::ParmSyntaxErr => 501,
            Reply::CmdNoSupport => 502,
            Reply::CmdBadSequence => 503,
            Reply::ParmNoSupport => 504,
            Reply::NotLoggedIn => 530,
            Reply::NotFound => 550,
            Reply::ActionAborted => 551,
            Reply::NameErr => 553,
        }
    }

    /// Message template. `%s` marks the spot filled by [`fill`].
    pub fn template(self) -> &'static str {
        match self {
            Reply::OkayOpening => "150 File status okay; about to open data connection.",
            Reply::Okay => "200 Command okay.",
            Reply::SystemStatus => {
                "211-Extensions supported:\r\n REST STREAM\r\n MDTM\r\n SIZE\r\n211 End"
            }
            Reply::FileStatus => "213 File status.",
            Reply::HelpMessage => concat!(
                "214-Commands recognized:\r\n",
                " NOOP  QUIT  REIN  SYST  FEAT  HELP  USER  PASS\r\n",
                " MODE  TYPE  STRU  PASV  PORT  PWD   CWD   CDUP\r\n",
                " MKD   RMD   NLST  LIST  RETR  STOR  APPE  REST\r\n",
                " DELE  RNFR  RNTO  SIZE  MDTM\r\n",
                "214 End"
            ),
            Reply::SystemType => "215 UNIX Type: L8.",
            Reply::ServerReady => "220 Service ready for new user.",
            Reply::ServerClosing => "221 Service closing control connection.",
            Reply::ClosingSuccess => "226 Closing data connection.",
            Reply::EnterPasvMode => "227 Entering Passive Mode (%s).",
            Reply::LoggedIn => "230 User logged in, proceed.",
            Reply::ActionComplete => "250 Requested file action okay, completed.",
            Reply::PathName => "257 \"%s\" created.",
            Reply::NeedPassword => "331 User name okay, need password.",
            Reply::NeedMoreInfo => "350 Requested file action pending further information.",
            Reply::NoService => "421 Service not available, closing control connection.",
            Reply::CantOpenData => "425 Can't open data connection.",
            Reply::ClosedConnAbort => "426 Connection closed; transfer aborted.",
            Reply::ParmSyntaxErr => "501 Syntax error in parameters or arguments.",
            Reply::CmdNoSupport => "502 Command not implemented.",
            Reply::CmdBadSequence => "503 Bad sequence of commands.",
            Reply::ParmNoSupport => "504 Command not implemented for that parameter.",
            Reply::NotLoggedIn => "530 Not logged in.",
            Reply::NotFound => "550 Requested action not taken. %s unavailable.",
            Reply::ActionAborted => "551 Requested action aborted.",
            Reply::NameErr => "553 Requested action not taken. File name not allowed.",
            Reply::Pbsz => "200 PBSZ=%s",
            Reply::Prot => "200 Protection level set to %s",
        }
    }
}

/// Renders a reply line. A caller-supplied message replaces the template.
/// No escaping is done on either.
pub fn format_reply(reply: Reply, message: Option<&str>) -> Vec<u8> {
    let text = message.unwrap_or_else(|| reply.template());
    let mut line = Vec::with_capacity(text.len() + 2);
    line.extend_from_slice(text.as_bytes());
    line.extend_from_slice(b"\r\n");
    line
}

/// Substitutes `arg` for the first `%s` of the reply template.
pub fn fill(reply: Reply, arg: &str) -> String {
    reply.template().replacen("%s", arg, 1)
}
