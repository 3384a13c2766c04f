use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use portfolio_rag::{
    api,
    assistant::Assistant,
    bootstrap::{self, Collaborators, DocumentSource, StartupOptions},
    config::{self, Config},
    embedding, llm,
    logging::{self, ConsoleVerbosity},
    portfolio::PortfolioClient,
    processing::ChunkingOptions,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "portfolio-rag",
    about = "Conversational assistant over portfolio documents and REST lookups"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Read `.txt` documents from this directory instead of downloading the archive.
    #[arg(long, global = true)]
    documents_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session on stdin/stdout (default).
    Chat,
    /// Serve the assistant over HTTP.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Chat);

    let verbosity = match command {
        Command::Chat => ConsoleVerbosity::Quiet,
        Command::Serve { .. } => ConsoleVerbosity::Full,
    };
    // `.env` may carry RUST_LOG and the log file path, so load it before tracing starts.
    dotenvy::dotenv().ok();
    logging::init_tracing(verbosity);

    let config = config::init_config().context("Failed to load configuration")?;
    config.log_summary();

    let documents_dir = cli.documents_dir.or_else(|| config.documents_dir.clone());
    let assistant = start_assistant(config, documents_dir).await?;

    match command {
        Command::Chat => chat(assistant).await,
        Command::Serve { port } => serve(assistant, port.or(config.server_port)).await,
    }
}

async fn start_assistant(
    config: &Config,
    documents_dir: Option<PathBuf>,
) -> Result<Assistant> {
    let api = PortfolioClient::new(&config.portfolio_api_url, config.portfolio_api_token.clone())
        .context("Invalid PORTFOLIO_API_URL")?;
    let collaborators = Collaborators {
        api: Arc::new(api),
        embedder: embedding::embedding_client_from_config(config),
        llm: llm::language_model_from_config(config),
    };
    let options = StartupOptions {
        source: documents_dir.map_or(DocumentSource::Archive, DocumentSource::Directory),
        chunking: ChunkingOptions {
            chunk_size: config.text_splitter_chunk_size,
            overlap: config.text_splitter_chunk_overlap,
            separator: config.text_splitter_separator.clone(),
        },
    };

    let assistant = bootstrap::prepare(collaborators, &options)
        .await
        .context("Startup failed")?;
    println!("API ping successful.");
    Ok(assistant)
}

async fn chat(mut assistant: Assistant) -> Result<()> {
    println!("Welcome! Ask about MasterClasses, team profiles, investments or sectors. Type 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nYour Query: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            println!("Exiting the session. Goodbye!");
            break;
        }

        let answer = assistant.respond(query).await;
        println!("\nAssistant: {}", answer.text);
    }
    Ok(())
}

async fn serve(assistant: Assistant, port: Option<u16>) -> Result<()> {
    let app = api::create_router(Arc::new(api::SharedAssistant::new(assistant)));
    let (listener, port) = bind_listener(port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
