use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use microftpd::config::Config;
use microftpd::core_auth::PasswdAuthenticator;
use microftpd::core_cli::Cli;
use microftpd::core_fs::LocalFileSystem;
use microftpd::core_log::init_logger;
use microftpd::helpers::{load_banner, log_config};
use microftpd::server::{self, ServerContext};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    init_logger(args.verbose);

    // Load configuration from the TOML file
    let mut config = Config::load_from_file(&args.config)?;

    // Override the PASV address from CLI if provided
    if let Some(pasv_address) = args.pasv_address {
        config.server.pasv_address = pasv_address;
        config
            .validate()
            .context("Invalid --pasv-address override")?;
    }

    let authenticator = PasswdAuthenticator::load(&config.server.passwd_file)?;
    if authenticator.is_empty() {
        error!("No user defined in {}", config.server.passwd_file);
    }

    let banner = match &config.server.banner_path {
        Some(path) => Some(load_banner(path)?),
        None => None,
    };

    let ctx = ServerContext::new(
        config,
        Arc::new(authenticator),
        Arc::new(LocalFileSystem::default()),
    )
    .context("Failed to initialize server")?
    .with_banner(banner);

    info!("Starting microftpd with configuration:");
    log_config(&ctx.config);

    // Run the FTP server
    if let Err(e) = server::run(Arc::new(ctx)).await {
        error!("Server stopped: {:#}", e);
        return Err(e);
    }

    Ok(())
}
