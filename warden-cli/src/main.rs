//! WARDEN CLI
//!
//! Runs the trusted-IP gate and administers its allowlist.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden_api::{ApiConfig, AppState, WardenServer};
use warden_core::types::AllowlistEntry;

/// WARDEN - trusted-IP gate for webhook ingress
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// List trusted IPs
    List,

    /// Add a trusted IP (or replace its description)
    Add {
        /// IPv4 or IPv6 address
        ip: String,
        /// Optional note
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit the description of a trusted IP
    Edit {
        /// Address to edit
        ip: String,
        /// New description (omit to clear)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a trusted IP
    Remove {
        /// Address to remove
        ip: String,
    },

    /// Check whether an address would pass the webhook gate
    Check {
        /// Address to check
        ip: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "warden=debug,info"
    } else {
        "warden=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = ApiConfig::from_env();

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(config, port, &bind).await,
        Commands::List => cmd_list(config).await,
        Commands::Add { ip, description } => cmd_add(config, &ip, description).await,
        Commands::Edit { ip, description } => cmd_edit(config, &ip, description).await,
        Commands::Remove { ip } => cmd_remove(config, &ip).await,
        Commands::Check { ip } => cmd_check(config, &ip).await,
    }
}

async fn connect(config: ApiConfig) -> Result<AppState> {
    AppState::connect(config)
        .await
        .context("Failed to open allowlist storage")
}

fn print_entry(entry: &AllowlistEntry) {
    println!(
        "   {:<40} {}  {}",
        entry.ip.green(),
        entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        entry.description.as_deref().unwrap_or("-"),
    );
}

fn note_running_servers() {
    println!(
        "   {}",
        "Running servers pick this up on their next cache refresh (at most one TTL).".dimmed()
    );
}

/// Run API server
async fn cmd_serve(config: ApiConfig, port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting WARDEN API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!(
        "   {} {}s",
        "Trusted IP cache TTL:".dimmed(),
        config.cache.ttl_seconds
    );
    println!("\n   Press Ctrl+C to stop.\n");

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    let state = connect(config).await?;
    WardenServer::new(state).run(addr).await?;

    Ok(())
}

/// List allowlist entries
async fn cmd_list(config: ApiConfig) -> Result<()> {
    let state = connect(config).await?;
    let entries = state.admin.list().await.context("Failed to list trusted IPs")?;

    if entries.is_empty() {
        println!("{}", "⚠️  Allowlist is empty. Every webhook caller will be rejected.".yellow());
        return Ok(());
    }

    println!("{} {}", "Trusted IPs:".cyan().bold(), entries.len());
    for entry in &entries {
        print_entry(entry);
    }

    Ok(())
}

/// Add or re-describe an entry
async fn cmd_add(config: ApiConfig, ip: &str, description: Option<String>) -> Result<()> {
    let state = connect(config).await?;
    let entry = state
        .admin
        .create(ip, description)
        .await
        .context("Failed to save trusted IP")?;

    println!("{}", "✅ Trusted IP saved:".green().bold());
    print_entry(&entry);
    note_running_servers();

    Ok(())
}

/// Edit an entry's description
async fn cmd_edit(config: ApiConfig, ip: &str, description: Option<String>) -> Result<()> {
    let state = connect(config).await?;
    let entry = state
        .admin
        .update(ip, description)
        .await
        .context("Failed to update trusted IP")?;

    println!("{}", "✅ Trusted IP updated:".green().bold());
    print_entry(&entry);
    note_running_servers();

    Ok(())
}

/// Remove an entry
async fn cmd_remove(config: ApiConfig, ip: &str) -> Result<()> {
    let state = connect(config).await?;
    let ip = state
        .admin
        .delete(ip)
        .await
        .context("Failed to remove trusted IP")?;

    println!("{} {}", "🗑️  Removed:".green().bold(), ip);
    note_running_servers();

    Ok(())
}

/// Check an address against the gate
async fn cmd_check(config: ApiConfig, ip: &str) -> Result<()> {
    let addr: IpAddr = ip.trim().parse().context("Invalid IP address")?;
    let state = connect(config).await?;

    let trusted = state.admin.trusted_ips().await;
    let stats = state.admin.cache().stats();

    if trusted.contains_addr(addr) {
        println!("{} {} is trusted", "✅".green(), addr);
    } else {
        println!("{} {} is NOT trusted", "❌".red(), addr);
    }

    println!(
        "   {} {:?} ({} addresses)",
        "Cache state:".dimmed(),
        stats.state,
        trusted.len()
    );
    println!("{}", serde_json::to_string_pretty(&trusted)?);

    Ok(())
}
