use crate::config::Config;
use crate::core_error::FtpError;
use crate::core_ftpcommand::reply::{format_reply, Reply};
use crate::core_network::writer::{send_buffer, RetryPolicy};
use anyhow::{Context, Result};
use log::{error, info};
use std::fs;
use tokio::io::AsyncWrite;

/// Sends raw reply bytes to the client.
pub async fn send_response<W>(
    writer: &mut W,
    policy: &RetryPolicy,
    message: &[u8],
) -> Result<(), FtpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_buffer(writer, message, policy).await
}

/// Sends a catalog reply, or `message` in its place.
pub async fn send_reply<W>(
    writer: &mut W,
    policy: &RetryPolicy,
    reply: Reply,
    message: Option<&str>,
) -> Result<(), FtpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_response(writer, policy, &format_reply(reply, message)).await
}

pub fn load_banner(path: &str) -> Result<String> {
    let banner = fs::read_to_string(path)
        .map_err(|e| {
            error!("Failed to read banner file: {}: {}", path, e);
            anyhow::Error::new(e)
        })
        .with_context(|| format!("Failed to read banner file: {}", path))?;

    if banner.trim().is_empty() {
        error!("Banner file is empty: {}", path);
        return Err(anyhow::Error::msg("Banner file is empty."));
    }

    info!("Banner file loaded successfully: {}", path);
    Ok(banner)
}

/// Renders a banner as `220-` continuation lines.
pub fn banner_lines(banner: &str) -> Vec<u8> {
    banner
        .lines()
        .map(|line| format!("220-{}\r\n", line.trim_end()))
        .collect::<String>()
        .into_bytes()
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!("  Control Port: {}", config.ctrl_port());
    info!("  Data Port: {}", config.data_port());
    info!("  Bind Address: {}", config.server.bind_address);
    info!(
        "  PASV Address: {}:{}",
        config.server.pasv_address, config.server.pasv_port
    );
    info!("  Max Sessions: {}", config.server.max_sessions);
    info!("  TLS: {}", if config.tls.enabled { "implicit" } else { "off" });
}
