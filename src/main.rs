//! Nazm - poetry submission and moderation service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nazm::{
    api::{self, ApiState},
    auth::{ttl_from_minutes, TokenIssuer},
    blob::{BlobStore, MemoryBlobStore, S3BlobStore},
    engine::{AdminSeed, EngineConfig, NazmEngine, NewVerse},
};

/// Poetry submission and moderation service.
#[derive(Parser)]
#[command(name = "nazm", about = "Poetry submission and moderation service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server.
    Serve {
        /// Address to bind the API server.
        #[arg(long, default_value = "0.0.0.0:8000", env = "NAZM_BIND")]
        bind: String,

        /// Data directory for the document database.
        #[arg(long, env = "NAZM_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Secret used to sign bearer tokens.
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,

        /// Bearer token lifetime.
        #[arg(long, env = "NAZM_TOKEN_TTL_MINUTES", default_value_t = 60)]
        token_ttl_minutes: u64,

        /// S3 bucket for uploads. Without one, uploads are kept in memory.
        #[arg(long, env = "AWS_BUCKET_NAME")]
        bucket: Option<String>,

        /// Lifetime of download links.
        #[arg(long, env = "NAZM_PRESIGN_TTL_SECS", default_value_t = 604_800)]
        presign_ttl_secs: u64,
    },

    /// Create an admin account (skipped if the email exists).
    CreateAdmin {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "NAZM_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Data directory for the document database.
        #[arg(long, env = "NAZM_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Load opening verses from a JSON array file.
    SeedVerses {
        /// File with `[{"content", "day", "language", "author"}]` entries.
        file: PathBuf,

        /// Data directory for the document database.
        #[arg(long, env = "NAZM_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Show service status.
    Status {
        /// Nazm API URL.
        #[arg(long, env = "NAZM_API_URL", default_value = "http://localhost:8000")]
        api_url: String,
    },

    /// Print the leaderboard.
    Leaderboard {
        /// Submission type: individual or full.
        #[arg(long = "type", default_value = "individual")]
        kind: String,

        /// Bearer token from /api/v1/auth/login.
        #[arg(long, env = "NAZM_TOKEN", hide_env_values = true)]
        token: String,

        /// Nazm API URL.
        #[arg(long, env = "NAZM_API_URL", default_value = "http://localhost:8000")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nazm=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            data_dir,
            jwt_secret,
            token_ttl_minutes,
            bucket,
            presign_ttl_secs,
        } => {
            let config = engine_config(data_dir)
                .with_presign_ttl(Duration::from_secs(presign_ttl_secs));
            let tokens = TokenIssuer::new(
                jwt_secret.as_bytes(),
                ttl_from_minutes(token_ttl_minutes),
            );
            run_server(&bind, config, tokens, bucket).await?;
        }

        Commands::CreateAdmin {
            name,
            email,
            password,
            data_dir,
        } => {
            create_admin(engine_config(data_dir), &name, &email, &password).await?;
        }

        Commands::SeedVerses { file, data_dir } => {
            seed_verses(engine_config(data_dir), &file).await?;
        }

        Commands::Status { api_url } => {
            show_status(&api_url).await?;
        }

        Commands::Leaderboard {
            kind,
            token,
            api_url,
        } => {
            show_leaderboard(&api_url, &token, &kind).await?;
        }
    }

    Ok(())
}

fn engine_config(data_dir: Option<PathBuf>) -> EngineConfig {
    match data_dir {
        Some(dir) => EngineConfig::new(dir),
        None => EngineConfig::default(),
    }
}

/// Open the engine for offline commands, which never touch blobs.
async fn open_local(config: EngineConfig) -> Result<NazmEngine> {
    let engine = NazmEngine::open(config, Arc::new(MemoryBlobStore::new()))
        .await
        .context("Failed to open the document store")?;
    Ok(engine)
}

/// Run the API server.
async fn run_server(
    bind: &str,
    config: EngineConfig,
    tokens: TokenIssuer,
    bucket: Option<String>,
) -> Result<()> {
    tracing::info!("Starting Nazm server...");

    let blobs: Arc<dyn BlobStore> = match bucket {
        Some(bucket) => Arc::new(S3BlobStore::new(bucket).await),
        None => {
            tracing::warn!("AWS_BUCKET_NAME not set, uploads are kept in memory and lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let engine = NazmEngine::open(config, blobs)
        .await
        .context("Failed to open the document store")?;

    let state = Arc::new(ApiState::new(engine, tokens));

    api::serve(state, bind).await?;

    Ok(())
}

async fn create_admin(config: EngineConfig, name: &str, email: &str, password: &str) -> Result<()> {
    let mut engine = open_local(config).await?;

    match engine.ensure_admin(name, email, password).await? {
        AdminSeed::Created(user) => {
            println!("Admin created: {} <{}> ({})", user.name, user.email, user.id);
        }
        AdminSeed::Exists(user) => {
            println!("Account already exists: {} <{}> ({})", user.name, user.email, user.role);
        }
    }

    Ok(())
}

async fn seed_verses(config: EngineConfig, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let verses: Vec<NewVerse> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid verse file {}", file.display()))?;

    let mut engine = open_local(config).await?;

    let count = verses.len();
    for verse in verses {
        let created = engine.create_verse(verse).await?;
        println!("Day {:>2}  {:<16} {}", created.day, created.language.as_str(), created.id);
    }

    println!("Inserted {} verses", count);

    Ok(())
}

/// Show service status via API.
async fn show_status(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/status", api_url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", response.status());
    }

    let status: serde_json::Value = response.json().await?;

    println!("Nazm Status");
    println!("===========");
    println!("Status:       {}", status["status"]);
    println!("Version:      {}", status["version"]);
    println!("Blob backend: {}", status["blob_backend"]);
    println!("Submissions:  {}", status["total_submissions"]);
    println!("  pending:    {}", status["pending_submissions"]);
    println!("  approved:   {}", status["approved_submissions"]);
    println!("  rated:      {}", status["rated_submissions"]);

    Ok(())
}

/// Print the leaderboard via API.
async fn show_leaderboard(api_url: &str, token: &str, kind: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/leaderboard?type={}", api_url, kind);

    let response = client
        .get(&url)
        .bearer_auth(token)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;
        anyhow::bail!("Failed to get leaderboard ({}): {}", status, error_text);
    }

    let body: serde_json::Value = response.json().await?;
    let entries = body["entries"].as_array().cloned().unwrap_or_default();

    if entries.is_empty() {
        println!("No ranked poets yet.");
        return Ok(());
    }

    println!("{:<5} {:<32} {:>8} {:>8}", "RANK", "POET", "STARS", "POEMS");
    println!("{}", "-".repeat(56));

    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "{:<5} {:<32} {:>8.1} {:>8}",
            rank + 1,
            entry["authorName"].as_str().unwrap_or("?"),
            entry["totalStars"].as_f64().unwrap_or(0.0),
            entry["submissionCount"].as_u64().unwrap_or(0)
        );
    }

    Ok(())
}
