//! authgate - account signup, login and role-gated dashboards
//!
//! Usage:
//!   authgate                      # start the HTTP server (same as `authgate serve`)
//!   authgate create-admin --name "Ops" --email ops@example.com --password 'long-password'

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env, process::ExitCode, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authgate_backend::{
    api::create_router,
    auth::{
        models::SignupPayload, AuthService, AuthState, CredentialHasher, JwtHandler,
        SqliteDirectory,
    },
    config::{self, AppConfig},
};

#[derive(Parser, Debug)]
#[command(name = "authgate")]
#[command(about = "Account registration, login and role-gated API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Provision an admin account directly in the database
    CreateAdmin {
        /// Admin's name
        #[arg(long)]
        name: String,

        /// Admin's email address
        #[arg(long)]
        email: String,

        /// Admin's password (min 8 chars)
        #[arg(long)]
        password: String,
    },
}

fn main() -> ExitCode {
    let env_loaded = config::load_env();
    init_tracing();
    if !env_loaded {
        warn!("No .env file found, using environment variables");
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            None | Some(Commands::Serve) => run_server().await,
            Some(Commands::CreateAdmin {
                name,
                email,
                password,
            }) => run_create_admin(name, email, password).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server() -> Result<()> {
    let config = AppConfig::from_env()?;

    let directory = Arc::new(SqliteDirectory::new(&config.database_path)?);
    info!(path = %config.database_path.display(), "Database connection successful");

    let jwt_handler = Arc::new(
        JwtHandler::new(&config.jwt_secret, config.jwt_expiration_hours)
            .context("Invalid signing configuration")?,
    );
    let service = AuthService::new(directory, CredentialHasher::default());
    let app = create_router(AuthState::new(service, jwt_handler));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        addr = %addr,
        token_ttl_hours = config.jwt_expiration_hours,
        "API server listening"
    );

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Operator-only path: never reachable over HTTP
async fn run_create_admin(name: String, email: String, password: String) -> Result<()> {
    info!("Running create-admin command");

    let database_path = config::database_path(&|key: &str| env::var(key).ok())?;
    let directory = Arc::new(SqliteDirectory::new(&database_path)?);

    let service = AuthService::new(directory, CredentialHasher::default());
    let admin = service
        .create_admin(SignupPayload {
            name,
            email,
            password,
        })
        .await
        .context("Failed to create admin user")?;

    info!(email = %admin.email, id = %admin.id, "Successfully created admin user");
    println!("Created admin {} ({})", admin.email, admin.id);
    Ok(())
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authgate_backend=debug,authgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
