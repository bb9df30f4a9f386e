//! ldapgate - directory lookup and login from the command line

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use ldapgate_auth::LdapConnector;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ldapgate")]
#[command(version = ldapgate_core::VERSION)]
#[command(about = "Authenticate users against an LDAP directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LDAPGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory server host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Directory server port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Search base DN
    #[arg(long, global = true)]
    base_dn: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LDAPGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Find an entry by the configured login attribute
    Lookup {
        /// Login attribute value
        value: String,
    },

    /// Check a user's password and optional group membership
    Login {
        username: String,

        /// Bind DN; looked up by username when omitted
        #[arg(long)]
        dn: Option<String>,

        /// Required group DN; defaults to the configured user group
        #[arg(long)]
        group: Option<String>,

        /// Password
        #[arg(long, env = "LDAPGATE_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Connect and bind the service account
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    config::apply_overrides(
        &mut config.directory,
        cli.host,
        cli.port,
        cli.base_dn,
    );

    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, &config.logging.format);

    debug!("Directory configuration: {:?}", config.directory);

    let connector =
        LdapConnector::new(config.directory).context("Invalid directory configuration")?;
    let mut ctx = CommandContext::new(connector, cli.output);

    let accepted = match cli.command {
        Commands::Lookup { value } => commands::lookup::execute(&mut ctx, &value)?,
        Commands::Login {
            username,
            dn,
            group,
            password,
        } => commands::login::execute(&mut ctx, &username, dn, group, &password)?,
        Commands::Check => commands::check::execute(&mut ctx)?,
    };

    ctx.connector.disconnect();

    Ok(if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output stays parseable
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
