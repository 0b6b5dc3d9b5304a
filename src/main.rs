use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use contact_dispatch::api::{self, SecurityConfig};
use contact_dispatch::config::AppConfig;
use contact_dispatch::db::Database;
use contact_dispatch::error::DispatchError;
use contact_dispatch::ingest::{Dispatcher, IngestRequest, SourceFormat};
use contact_dispatch::models::{CreateAgentInput, ListDetail, Mobile};

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(about = "Split uploaded contact lists evenly across active agents")]
struct Cli {
    /// Database file (defaults to DISPATCH_DB_PATH or the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Distribute a local CSV/XLSX/XLS file across the active agents
    Import {
        file: PathBuf,

        /// Identity recorded as the uploader
        #[arg(long)]
        uploaded_by: String,
    },
    /// Show every stored list, newest first
    Lists,
    /// Show one list with its items
    Show { id: Uuid },
    /// Manage agents
    #[command(subcommand)]
    Agent(AgentCommands),
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Register a new active agent
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        country_code: String,
        #[arg(long)]
        number: String,
    },
    /// List all agents, newest first
    List,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "contact_dispatch=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    let db = match &config.db_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.db {
        config.db_path = Some(path);
    }

    match cli.command.unwrap_or(Commands::Serve { port: 3000 }) {
        Commands::Serve { port } => {
            let db = open_database(&config)?;
            let app = api::create_router(db, &config, SecurityConfig::from_env());

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!(
                roster_limit = config.roster_limit,
                "Dispatch server listening on http://127.0.0.1:{}",
                port
            );

            axum::serve(listener, app).await?;
        }
        Commands::Import { file, uploaded_by } => {
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", file.display()))?
                .to_string();
            let format = SourceFormat::from_file_name(&file_name)
                .ok_or_else(|| DispatchError::UnsupportedFileType(file_name.clone()))?;
            let payload = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let db = open_database(&config)?;
            let dispatcher = Dispatcher::new(Arc::new(db), config.roster_limit);
            let detail = dispatcher.ingest(IngestRequest {
                payload: &payload,
                format,
                file_name: &file_name,
                uploaded_by: &uploaded_by,
            })?;

            print_detail(&detail, false);
        }
        Commands::Lists => {
            let db = open_database(&config)?;
            let dispatcher = Dispatcher::new(Arc::new(db), config.roster_limit);

            for summary in dispatcher.list_summaries()? {
                let split: Vec<String> = summary
                    .distributions
                    .iter()
                    .map(|d| d.item_count.to_string())
                    .collect();
                println!(
                    "{}  {}  {} items [{}]  by {}  at {}",
                    summary.id,
                    summary.file_name,
                    summary.total_items,
                    split.join("/"),
                    summary.uploaded_by,
                    summary.created_at.to_rfc3339()
                );
            }
        }
        Commands::Show { id } => {
            let db = open_database(&config)?;
            let dispatcher = Dispatcher::new(Arc::new(db), config.roster_limit);
            print_detail(&dispatcher.get_detail(id)?, true);
        }
        Commands::Agent(AgentCommands::Add {
            name,
            email,
            country_code,
            number,
        }) => {
            let db = open_database(&config)?;
            let agent = db.create_agent(CreateAgentInput {
                name,
                email,
                mobile: Mobile {
                    country_code,
                    number,
                },
            })?;
            println!("{}  {}  <{}>", agent.id, agent.name, agent.email);
        }
        Commands::Agent(AgentCommands::List) => {
            let db = open_database(&config)?;
            for agent in db.get_all_agents()? {
                println!(
                    "{}  {}  <{}>  {} {}  {}",
                    agent.id,
                    agent.name,
                    agent.email,
                    agent.mobile.country_code,
                    agent.mobile.number,
                    if agent.is_active { "active" } else { "inactive" }
                );
            }
        }
    }

    Ok(())
}

fn print_detail(detail: &ListDetail, with_items: bool) {
    println!(
        "{}  {}  {} items  by {}",
        detail.id, detail.file_name, detail.total_items, detail.uploaded_by
    );

    for distribution in &detail.distributions {
        let agent = distribution
            .agent
            .as_ref()
            .map(|a| format!("{} <{}>", a.name, a.email))
            .unwrap_or_else(|| format!("{} (deleted)", distribution.agent_id));
        println!("  {}: {} items", agent, distribution.item_count);

        if with_items {
            for item in &distribution.items {
                println!("    {}  {}  {}", item.first_name(), item.phone(), item.notes());
            }
        }
    }
}
