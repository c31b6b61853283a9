use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use inv_server::{InventoryServer, ServerConfig};

use crate::cli::Cli;

/// Resolve configuration, open the store and serve until Ctrl-C.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli).await?;
    let existed = config.cache_dir.is_dir();

    let server = InventoryServer::open(config)
        .await
        .context("failed to open the cache directory")?;
    print_startup(&cli, server.config(), existed);

    server.serve(shutdown_signal()).await?;
    println!("{} Server stopped.", "✓".green());
    Ok(())
}

/// Start from the optional config file, then apply the command-line flags.
pub async fn build_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path).await?,
        None => ServerConfig::default(),
    };
    config.cache_dir = resolve_cache_dir(&cli.cache)?;
    config.bind_addr = resolve_bind_addr(&cli.host, cli.port).await?;
    Ok(config)
}

fn resolve_cache_dir(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("cannot resolve cache directory {}", path.display()))
}

async fn resolve_bind_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("cannot resolve host {host}"))?
        .next()
        .with_context(|| format!("host {host} has no addresses"))
}

fn print_startup(cli: &Cli, config: &ServerConfig, existed: bool) {
    let cache = config.cache_dir.display().to_string();
    if existed {
        println!("Cache directory {} already exists.", cache.cyan());
    } else {
        println!("{} Created cache directory {}", "✓".green(), cache.cyan());
    }

    println!("{}", "Parameters:".bold());
    println!("  Port:  {}", cli.port.to_string().yellow());
    println!("  Cache: {}", cache.cyan());
    println!("  Host:  {}", cli.host.yellow());

    let base = format!("http://{}:{}", cli.host, cli.port);
    println!("{} Listening on {}", "✓".green().bold(), base.bold());
    println!("  Register form: {}/RegisterForm.html", base);
    println!("  Search form:   {}/SearchForm.html", base);
    println!("  Inventory:     {}/inventory", base);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C; shutting down");
        return;
    }
    tracing::info!("shutdown requested");
}
