use crate::constants::{
    DEFAULT_CTRL_PORT, DEFAULT_CTRL_PORT_SECURE, DEFAULT_DATA_PORT, DEFAULT_DATA_PORT_SECURE,
    NET_BUF_LEN,
};
use crate::core_error::FtpError;
use crate::core_tls::TlsConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub secure_listen_port: u16,
    pub data_port: u16,
    pub secure_data_port: u16,
    pub bind_address: String,
    pub pasv_address: String, // Public IPv4 address advertised by PASV
    pub pasv_port: u16,       // 0 = advertise whatever port gets bound
    pub max_sessions: usize,
    pub banner_path: Option<String>,
    pub passwd_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub ctrl_rx_timeout_ms: u64,
    pub dtp_accept_timeout_ms: u64,
    pub dtp_accept_retry: u32,
    pub dtp_connect_timeout_ms: u64,
    pub dtp_rx_timeout_ms: u64,
    pub tx_retry: u32,
    pub tx_retry_delay_ms: u64,
    pub tx_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    pub user_len_max: usize,
    pub pass_len_max: usize,
    pub path_len_max: usize,
    pub name_len_max: usize,
    pub ctrl_line_max: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub limits: LimitConfig,
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_CTRL_PORT,
            secure_listen_port: DEFAULT_CTRL_PORT_SECURE,
            data_port: DEFAULT_DATA_PORT,
            secure_data_port: DEFAULT_DATA_PORT_SECURE,
            bind_address: String::from("0.0.0.0"),
            pasv_address: String::from("127.0.0.1"),
            pasv_port: 0,
            max_sessions: 1,
            banner_path: None,
            passwd_file: String::from("/etc/microftpd.passwd"),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ctrl_rx_timeout_ms: 30_000,
            dtp_accept_timeout_ms: 5_000,
            dtp_accept_retry: 3,
            dtp_connect_timeout_ms: 5_000,
            dtp_rx_timeout_ms: 5_000,
            tx_retry: 3,
            tx_retry_delay_ms: 100,
            tx_timeout_ms: 5_000,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            user_len_max: 32,
            pass_len_max: 32,
            path_len_max: 256,
            name_len_max: 256,
            ctrl_line_max: NET_BUF_LEN,
        }
    }
}

impl TimeoutConfig {
    pub fn ctrl_rx(&self) -> Duration {
        Duration::from_millis(self.ctrl_rx_timeout_ms)
    }

    pub fn dtp_accept(&self) -> Duration {
        Duration::from_millis(self.dtp_accept_timeout_ms)
    }

    pub fn dtp_connect(&self) -> Duration {
        Duration::from_millis(self.dtp_connect_timeout_ms)
    }

    pub fn dtp_rx(&self) -> Duration {
        Duration::from_millis(self.dtp_rx_timeout_ms)
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in file: {}", path))?;
        Ok(config)
    }

    /// Checks the values the engine relies on at runtime.
    pub fn validate(&self) -> Result<(), FtpError> {
        if self.server.max_sessions == 0 {
            return Err(FtpError::Config("max_sessions must be at least 1".into()));
        }
        if self.timeouts.dtp_accept_retry == 0 || self.timeouts.tx_retry == 0 {
            return Err(FtpError::Config("retry budgets must be at least 1".into()));
        }
        if self.limits.user_len_max == 0
            || self.limits.pass_len_max == 0
            || self.limits.path_len_max == 0
            || self.limits.name_len_max == 0
            || self.limits.ctrl_line_max == 0
        {
            return Err(FtpError::Config("length limits must be non-zero".into()));
        }
        self.pasv_ip()?;
        self.server
            .bind_address
            .parse::<Ipv4Addr>()
            .map_err(|e| FtpError::Config(format!("invalid bind_address: {}", e)))?;
        Ok(())
    }

    pub fn pasv_ip(&self) -> Result<Ipv4Addr, FtpError> {
        self.server
            .pasv_address
            .parse::<Ipv4Addr>()
            .map_err(|e| FtpError::Config(format!("invalid pasv_address: {}", e)))
    }

    /// Control port matching the security mode.
    pub fn ctrl_port(&self) -> u16 {
        if self.tls.enabled {
            self.server.secure_listen_port
        } else {
            self.server.listen_port
        }
    }

    /// Default data endpoint port matching the security mode.
    pub fn data_port(&self) -> u16 {
        if self.tls.enabled {
            self.server.secure_data_port
        } else {
            self.server.data_port
        }
    }
}
