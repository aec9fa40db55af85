use anyhow::Result;
use clap::{Parser, Subcommand};
use schema_engine::archive::Archive;
use schema_engine::http::{router, AppState};
use schema_engine::kit::DrizzleKit;
use schema_engine::{generate_drizzle, lint_schema, load_schema_file, read_schema_value};
use schema_engine::{Config, Engine};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind; defaults to 0.0.0.0 on PORT
        #[arg(long)]
        addr: Option<String>,
    },
    /// Render drizzle source for a schema file
    Generate {
        /// JSON or TOML schema definition
        #[arg(long)]
        schema: PathBuf,
        /// Path to write the generated source. Prints to stdout if not set.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a schema file and report every issue
    Validate {
        #[arg(long)]
        schema: PathBuf,
    },
    /// Generate migrations for a tenant and apply them
    Sync {
        tenant: String,
        #[arg(long)]
        schema: PathBuf,
        /// Database URL; falls back to the DB_* settings
        #[arg(long)]
        url: Option<String>,
    },
    /// Apply migrations generated by an earlier sync or API call
    Migrate { tenant: String },
    /// Run drizzle-kit's consistency check for a tenant
    Check { tenant: String },
}

fn build_engine(config: &Config) -> Result<Engine<DrizzleKit>> {
    let kit = DrizzleKit::new(&config.kit)?;
    let archive = config
        .storage
        .as_ref()
        .map(Archive::from_config)
        .transpose()?;
    Ok(Engine::new(config, kit, archive))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.server.log_level)
        .init();

    match cli.command {
        Commands::Serve { addr } => {
            let engine = Arc::new(build_engine(&config)?);
            let state = Arc::new(AppState {
                engine,
                production: config.is_production(),
            });
            let app = router(state);
            let addr = addr.unwrap_or_else(|| format!("0.0.0.0:{}", config.server.port));
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(%addr, env = ?config.server.env, "schema engine listening");
            axum::serve(listener, app).await?;
        }
        Commands::Generate { schema, out } => {
            let input = load_schema_file(&schema)?;
            let source = generate_drizzle(&input);
            if let Some(path) = out {
                fs::write(path, source)?;
            } else {
                print!("{}", source);
            }
        }
        Commands::Validate { schema } => {
            let errors = lint_schema(&read_schema_value(&schema)?);
            if errors.is_empty() {
                println!("Schema is valid");
            } else {
                for e in &errors {
                    eprintln!("{}", e);
                }
                anyhow::bail!("Schema validation failed");
            }
        }
        Commands::Sync {
            tenant,
            schema,
            url,
        } => {
            let input = load_schema_file(&schema)?;
            let engine = build_engine(&config)?;
            let artifacts = engine.sync(&tenant, &input, url.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&artifacts)?);
        }
        Commands::Migrate { tenant } => {
            build_engine(&config)?.migrate(&tenant).await?;
            println!("Migration applied for tenant {}", tenant);
        }
        Commands::Check { tenant } => {
            build_engine(&config)?.check(&tenant).await?;
            println!("Migrations for tenant {} are consistent", tenant);
        }
    }

    Ok(())
}
