// src/constants.rs

/// Capacity of one network buffer (control line, listing batch, file chunk).
pub const NET_BUF_LEN: usize = 1460;

pub const PATH_SEP_CHAR: char = '/';
pub const ROOT_PATH: &str = "/";
pub const CURRENT_PATH: &str = ".";
pub const PARENT_PATH: &str = "..";

pub const DEFAULT_CTRL_PORT: u16 = 21;
pub const DEFAULT_DATA_PORT: u16 = 20;
pub const DEFAULT_CTRL_PORT_SECURE: u16 = 990;
pub const DEFAULT_DATA_PORT_SECURE: u16 = 989;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/microftpd.conf";

/// Length of an MDTM timestamp argument (YYYYMMDDHHMMSS).
pub const MDTM_TIMESTAMP_LEN: usize = 14;
pub const MDTM_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Month abbreviations used by LIST, `ls` style.
pub const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
