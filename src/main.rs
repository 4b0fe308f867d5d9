use clap::{Parser, Subcommand};
use shortkey::admin::{self, AdminCommands};
use shortkey::config::{Config, LogFormat};
use shortkey::error::AppResult;
use shortkey::server;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// shortkey - A URL shortener with secret admin keys
#[derive(Parser, Debug)]
#[command(name = "shortkey")]
#[command(version)]
#[command(about = "A URL shortener with secret admin keys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server
    Server {
        /// Host to bind to (overrides SERVER_HOST env var)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides SERVER_PORT env var)
        #[arg(long)]
        port: Option<u16>,

        /// Run migrations on startup
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        migrate: bool,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        admin_command: AdminCommands,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.log.format);

    match cli.command {
        Commands::Server {
            host,
            port,
            migrate,
        } => {
            // An explicit BASE_URL wins over the bind address
            let base_url_overridden = std::env::var("BASE_URL").is_ok();
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if !base_url_overridden {
                config.url.base_url =
                    format!("http://{}:{}", config.server.host, config.server.port);
            }

            let addr = format!("{}:{}", config.server.host, config.server.port);
            server::run_server(config, addr, migrate).await
        }
        Commands::Admin { admin_command } => admin::run(config, admin_command).await,
    }
}
