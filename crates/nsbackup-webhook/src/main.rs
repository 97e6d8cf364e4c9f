//! nsbackup webhook - Velero backups driven by namespace labels

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;

mod commands;
mod error;
mod logging;
mod server;
mod webhook;

use logging::LogFormat;

#[derive(Parser)]
#[command(name = "nsbackup-webhook")]
#[command(version)]
#[command(about = "Admission webhook that keeps Velero schedules in step with namespace labels", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level or filter directives (e.g. info,kube=warn)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "debug")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve admission reviews over HTTPS
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:443")]
        addr: SocketAddr,

        /// TLS certificate (PEM)
        #[arg(long, env = "TLS_CERT", default_value = "/etc/admission-webhook/tls/tls.crt")]
        tls_cert: PathBuf,

        /// TLS private key (PEM)
        #[arg(long, env = "TLS_KEY", default_value = "/etc/admission-webhook/tls/tls.key")]
        tls_key: PathBuf,

        /// Backup configuration file (YAML)
        #[arg(short, long, env = "NSBACKUP_CONFIG")]
        config: Option<PathBuf>,

        /// Seconds to let in-flight reviews finish after SIGTERM
        #[arg(long, default_value_t = 30)]
        shutdown_grace: u64,
    },

    /// Show the backup actions a stored AdmissionReview would trigger
    Decide {
        /// AdmissionReview JSON file
        review: PathBuf,

        /// Backup configuration file (YAML)
        #[arg(short, long, env = "NSBACKUP_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config {
        /// Backup configuration file (YAML)
        #[arg(short, long, env = "NSBACKUP_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Serve {
            addr,
            tls_cert,
            tls_key,
            config,
            shutdown_grace,
        } => {
            if rustls::crypto::aws_lc_rs::default_provider()
                .install_default()
                .is_err()
            {
                tracing::debug!("rustls crypto provider already installed");
            }

            let server_config = server::ServerConfig {
                addr,
                cert_path: tls_cert,
                key_path: tls_key,
                shutdown_grace: Duration::from_secs(shutdown_grace),
            };
            commands::serve::run(server_config, config.as_deref()).await?
        }

        Commands::Decide { review, config } => commands::decide::run(&review, config.as_deref())?,

        Commands::Config { config } => commands::config::run(config.as_deref())?,
    }

    Ok(())
}
