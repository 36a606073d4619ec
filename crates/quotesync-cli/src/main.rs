use anyhow::Context;
use clap::Parser;
use quotesync_api::PostsClient;
use quotesync_core::{
    AlwaysAccept, AlwaysDecline, CategoryFilter, Config, ConflictResolver, DurableStore,
    EphemeralCache, ImportExport, ImportStrictness, Notification, Notifier, Quote, QuoteBook,
    RemoteSource, Resolution, ResolutionPolicy, ServerSource, SyncEngine, SyncOutcome,
    TracingNotifier,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;
mod session;

use console::{ConsoleNotifier, PromptResolver};

#[derive(Parser)]
#[command(name = "quotesync")]
#[command(version, about = "Offline-first quote collection that syncs with a server", long_about = None)]
struct Cli {
    /// Quote database file (overrides the config file)
    #[arg(long, global = true, env = "QUOTESYNC_DB")]
    db: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List quotes
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List categories in the order they first appear
    Categories,
    /// Add a quote
    Add {
        #[arg(short, long)]
        text: String,
        #[arg(short, long)]
        category: String,
    },
    /// Show a random quote (and remember the category)
    Random {
        /// Category to pick from; "all" for any
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Export all quotes as JSON
    Export {
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge quotes from a JSON file
    Import {
        file: PathBuf,
        /// Skip malformed entries instead of rejecting the file
        #[arg(long)]
        lax: bool,
    },
    /// Sync once with the server
    Sync {
        /// prompt, accept or decline
        #[arg(long)]
        resolution: Option<ResolutionPolicy>,
    },
    /// Send a quote to the server
    Push {
        #[arg(short, long)]
        text: String,
        #[arg(short, long)]
        category: String,
    },
    /// Interactive session with periodic background sync
    Watch {
        /// Seconds between syncs
        #[arg(long)]
        interval: Option<u64>,
        /// accept or decline (prompt falls back to decline here)
        #[arg(long)]
        resolution: Option<ResolutionPolicy>,
    },
    /// Show the effective config, or write it out with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so exported JSON on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotesync=info,quotesync_core=info,quotesync_api=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.storage.db_path = Some(db);
    }

    match cli.command {
        Some(Commands::List { category }) => {
            let book = open_book(&config);
            let filter = CategoryFilter::from(category);
            let mut shown = 0;
            for quote in book.filtered(&filter) {
                println!("[{}] {}", quote.category(), quote.text());
                shown += 1;
            }
            if shown == 0 {
                println!("No quotes found for this category.");
            }
        }
        Some(Commands::Categories) => {
            let book = open_book(&config);
            for category in book.categories().iter() {
                println!("{}", category);
            }
        }
        Some(Commands::Add { text, category }) => {
            let mut book = open_book(&config);
            let quote = book.add_quote(&text, &category)?;
            println!("Quote added successfully: {}", quote);
        }
        Some(Commands::Random { category }) => {
            let book = open_book(&config);
            let filter = match category {
                Some(name) => {
                    let filter = CategoryFilter::from(Some(name));
                    book.select_category(&filter);
                    filter
                }
                None => book.selected_category(),
            };

            match book.show_random(&filter) {
                Some(quote) => println!("\"{}\"", quote.text()),
                None => println!("No quotes found for this category."),
            }
        }
        Some(Commands::Export { output }) => {
            let book = open_book(&config);
            match output {
                Some(path) => {
                    ImportExport::export_to_file(book.quotes().as_slice(), &path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported {} quotes to {}", book.quotes().len(), path.display());
                }
                None => println!("{}", book.export_json()?),
            }
        }
        Some(Commands::Import { file, lax }) => {
            let strictness = if lax {
                ImportStrictness::Lax
            } else {
                config.import.strictness
            };
            let mut book = open_book(&config);
            let added = book
                .import_file(&file, strictness)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            println!("Quotes imported successfully! ({} added)", added);
        }
        Some(Commands::Sync { resolution }) => {
            let policy = resolution.unwrap_or(config.sync.resolution);
            let engine = build_engine(&config, policy)?;
            report(engine.sync_now().await);
        }
        Some(Commands::Push { text, category }) => {
            let quote = Quote::new(text, category)?;
            let source = server_source(&config)?;
            if source.push(&quote).await {
                notifier().notify(Notification::info(
                    "Quote posted to server.",
                    config.notifications.duration(),
                ));
            } else {
                anyhow::bail!("Server did not accept the quote");
            }
        }
        Some(Commands::Watch {
            interval,
            resolution,
        }) => {
            let policy = match resolution.unwrap_or(config.sync.resolution) {
                ResolutionPolicy::Prompt => {
                    tracing::warn!("Prompting isn't available in a session, declining conflicts instead");
                    ResolutionPolicy::Decline
                }
                other => other,
            };
            let every = match interval {
                Some(secs) => std::time::Duration::from_secs(secs.max(1)),
                None => config.sync.interval(),
            };

            let engine = Arc::new(build_engine(&config, policy)?);
            session::run(engine, every).await?;
        }
        Some(Commands::Config { init }) => {
            if init {
                let path = match &cli.config {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                println!("Wrote config to {}", path.display());
            } else {
                print!("{}", toml_preview(&config)?);
            }
        }
        None => {
            println!("No command specified. Try --help");
        }
    }

    Ok(())
}

/// Open the durable store, falling back to memory if the database is unusable
fn open_book(config: &Config) -> QuoteBook {
    let store = match config.db_path().and_then(DurableStore::open) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("Quote database unavailable ({}), changes won't be saved", e);
            DurableStore::in_memory()
        }
    };
    QuoteBook::open(store, EphemeralCache::session())
}

fn server_source(config: &Config) -> anyhow::Result<ServerSource> {
    let client = PostsClient::with_base_url(config.remote.base_url.clone())?
        .with_retry_config(config.remote.retry.clone());

    Ok(ServerSource::new(client)
        .with_fetch_limit(config.remote.fetch_limit)
        .with_user_id(config.remote.user_id))
}

fn build_engine(config: &Config, policy: ResolutionPolicy) -> anyhow::Result<SyncEngine> {
    let resolver: Arc<dyn ConflictResolver> = match policy.fixed() {
        None => Arc::new(PromptResolver),
        Some(Resolution::Accept) => Arc::new(AlwaysAccept),
        Some(Resolution::Decline) => Arc::new(AlwaysDecline),
    };

    let engine = SyncEngine::new(
        open_book(config).into_shared(),
        Arc::new(server_source(config)?),
        resolver,
        notifier(),
    )
    .with_notice_duration(config.notifications.duration());

    Ok(engine)
}

/// Notices go to the terminal when there is one, otherwise into the log
fn notifier() -> Arc<dyn Notifier> {
    if std::io::stdout().is_terminal() {
        Arc::new(ConsoleNotifier)
    } else {
        Arc::new(TracingNotifier)
    }
}

fn report(outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::NoChange => println!("Already in sync with the server."),
        SyncOutcome::Overwritten { count } => println!("Local quotes replaced ({} from server).", count),
        SyncOutcome::KeptLocal => println!("Kept local quotes."),
        SyncOutcome::Busy => println!("A sync is already in progress."),
    }
}

fn toml_preview(config: &Config) -> anyhow::Result<String> {
    let mut out = format!("# {}\n", Config::config_path()?.display());
    out.push_str(&format!("# database: {}\n", config.db_path()?.display()));
    out.push_str(&toml::to_string_pretty(config)?);
    Ok(out)
}
