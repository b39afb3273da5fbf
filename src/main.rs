use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use coterie::auth::TokenGenerator;
use coterie::config::ServerConfig;
use coterie::mail::MailLog;
use coterie::server::{AppState, create_router};
use coterie::store::{SqliteStore, Store};
use coterie::types::User;

#[derive(Parser)]
#[command(name = "coterie")]
#[command(about = "A multi-tenant workspace server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to (default 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default 8080)
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database (default ./data)
        #[arg(long)]
        data_dir: Option<String>,

        /// Optional TOML config file; CLI flags override its values
        #[arg(long)]
        config: Option<String>,

        /// Session token lifetime in seconds (default: never expires)
        #[arg(long)]
        session_ttl: Option<i64>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create the database, optionally a first account)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("coterie.db");
    if db_path.exists() {
        bail!("Server already initialized at {}", db_path.display());
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Database created at {}", db_path.display());

    if !non_interactive {
        create_first_account_prompt(&store)?;
    }

    Ok(())
}

fn create_first_account_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_account = inquire::Confirm::new("Would you like to create a first account?")
        .with_default(false)
        .prompt()?;

    if !create_account {
        return Ok(());
    }

    let name = inquire::Text::new("Name:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Name cannot be empty".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| {
            if !input.contains('@') {
                Err("Email must be a valid address".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let password = inquire::Password::new("Password:").prompt()?;

    let generator = TokenGenerator::new();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        email,
        password_hash: generator.hash(&password)?,
        picture: None,
        // Accounts created at the console skip mail activation.
        activation_code: None,
        reset_code: None,
        reset_code_expires_at: None,
        created_at: now,
        updated_at: now,
    };

    store.create_user(&user)?;

    println!();
    println!("Created account '{}'. You can log in now.", user.email);
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("coterie=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            config,
            session_ttl,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir.into();
            }
            if session_ttl.is_some() {
                config.session_ttl_seconds = session_ttl;
            }

            fs::create_dir_all(&config.data_dir)?;
            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let state = Arc::new(AppState::new(
                Arc::new(store),
                Arc::new(MailLog),
                config.session_ttl_seconds,
            ));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
