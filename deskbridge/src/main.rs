use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use deskbridge::commands::{
    parse_params, CalendarAction, CommentsAction, DocsAction, DriveAction, MailAction, Request,
    SheetsAction, TasksAction,
};
use deskbridge::{output, settings, ProcessConnector, Shell};
use deskbridge_core::cache::config::DEFAULT_NAMESPACE;
use deskbridge_core::{catalog, CacheConfig, CachedClient, ResponseCache, SessionManager};

#[derive(Parser)]
#[command(name = "deskbridge")]
#[command(about = "Mail, calendar, files, docs, sheets and tasks over one cached session", long_about = None)]
struct Cli {
    /// Bypass the cache for reads
    #[arg(long, global = true)]
    fresh: bool,

    /// Cache namespace
    #[arg(long, global = true, env = "DESKBRIDGE_CACHE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Maximum number of cached responses
    #[arg(long, global = true, env = "DESKBRIDGE_CACHE_MAX_ENTRIES", default_value_t = 10_000)]
    max_entries: usize,

    /// Settings file (defaults to ./.env, then the user config directory)
    #[arg(long, global = true, env = "DESKBRIDGE_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mail messages, threads and labels
    Mail {
        #[command(subcommand)]
        action: MailAction,
    },

    /// Calendars and events
    Calendar {
        #[command(subcommand)]
        action: CalendarAction,
    },

    /// Files and folders
    Drive {
        #[command(subcommand)]
        action: DriveAction,
    },

    /// Documents
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Spreadsheets
    Sheets {
        #[command(subcommand)]
        action: SheetsAction,
    },

    /// Task lists and tasks
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },

    /// Comments on files
    Comments {
        #[command(subcommand)]
        action: CommentsAction,
    },

    /// Run any catalog operation with JSON parameters
    Call {
        /// Operation name, e.g. search_gmail_messages
        operation: String,

        /// Parameters as a JSON object
        params: Option<String>,
    },

    /// Interactive shell keeping one session and cache alive
    Shell,

    /// List known operations
    Ops,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only results
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "deskbridge=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let request = match cli.command {
        Commands::Ops => {
            output::write_operations(&mut std::io::stdout().lock(), catalog::operations())?;
            return Ok(());
        }
        Commands::Shell => None,
        Commands::Mail { action } => Some(action.into_request()?),
        Commands::Calendar { action } => Some(action.into_request()?),
        Commands::Drive { action } => Some(action.into_request()?),
        Commands::Docs { action } => Some(action.into_request()?),
        Commands::Sheets { action } => Some(action.into_request()?),
        Commands::Tasks { action } => Some(action.into_request()?),
        Commands::Comments { action } => Some(action.into_request()?),
        Commands::Call { operation, params } => {
            Some(Request::new(operation, parse_params(params.as_deref())?))
        }
    };

    let config = settings::load_session_config(cli.env_file.as_deref())?;
    let session = Arc::new(SessionManager::new(config, Arc::new(ProcessConnector::new())));

    let cache = ResponseCache::new(
        CacheConfig::builder()
            .namespace(cli.namespace.clone())
            .max_entries(cli.max_entries)
            .build(),
    )
    .context("Invalid cache settings")?;
    let client = Arc::new(CachedClient::with_cleanup(Arc::new(cache), session.clone()));

    let outcome = match request {
        Some(request) => run_once(&client, request, cli.fresh).await,
        None => run_shell(client.clone(), cli.fresh).await,
    };

    client.shutdown().await;
    if let Err(e) = session.disconnect().await {
        tracing::warn!("Session did not shut down cleanly: {}", e);
    }

    outcome
}

async fn run_once(client: &CachedClient, request: Request, fresh: bool) -> Result<()> {
    let result = if fresh {
        client.call_fresh(&request.operation, request.params).await
    } else {
        client.call(&request.operation, request.params).await
    };

    let payload = result.with_context(|| format!("{} failed", request.operation))?;
    println!("{}", payload.render());
    Ok(())
}

async fn run_shell(client: Arc<CachedClient>, fresh: bool) -> Result<()> {
    let interactive = std::io::stdin().is_terminal();
    if interactive {
        eprintln!("deskbridge shell, :help for commands");
    }

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    Shell::new(client)
        .fresh(fresh)
        .run(input, &mut out, interactive)
        .await
}
