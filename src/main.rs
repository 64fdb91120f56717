use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

use readmaster::adapter::{AdapterRegistry, SourceAdapter};
use readmaster::analysis::{build_request, Analyst, OpenAiClient, TextCompletion};
use readmaster::config::Config;
use readmaster::feed::FeedClient;
use readmaster::model::{
    FilterRules, NewSource, SourceConfig, SourceType, DEFAULT_OWNER, DEFAULT_SYNC_INTERVAL_SECS,
};
use readmaster::normalize::Normalizer;
use readmaster::storage::{ContentStore, Database, DatabaseError};
use readmaster::sync::{SyncError, SyncReport, Syncer};
use readmaster::util::{strip_control_chars, truncate_chars};

/// Get the config directory path (~/.config/readmaster/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("readmaster"))
}

#[derive(Parser, Debug)]
#[command(name = "readmaster", about = "Fetch, filter and store content from RSS and YouTube feeds")]
struct Args {
    /// Config file (default: ~/.config/readmaster/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List source types that can be synced
    Types,
    /// Manage sources
    #[command(subcommand)]
    Sources(SourcesCommand),
    /// Fetch new content
    Sync {
        /// Only sync this source
        #[arg(long, value_name = "ID")]
        source: Option<i64>,
        /// Only sync sources whose interval has elapsed
        #[arg(long, conflicts_with = "source")]
        due: bool,
    },
    /// Show stored content, newest first
    Contents {
        #[arg(long, value_name = "ID")]
        source: Option<i64>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Run an AI analysis over one content item
    Analyze {
        content_id: i64,
        /// System prompt (defaults to a summarizer)
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SourcesCommand {
    List,
    Add(AddSource),
    Remove { id: i64 },
    Enable { id: i64 },
    Disable { id: i64 },
}

#[derive(ClapArgs, Debug)]
struct AddSource {
    #[arg(long)]
    name: String,
    /// Source type tag (rss, youtube, ...)
    #[arg(long = "type", value_name = "TYPE")]
    source_type: String,
    /// Feed URL (rss)
    #[arg(long)]
    url: Option<String>,
    /// YouTube channel id
    #[arg(long)]
    channel_id: Option<String>,
    /// YouTube playlist id
    #[arg(long)]
    playlist_id: Option<String>,
    /// Extra configuration entries
    #[arg(long = "set", value_name = "KEY=VALUE")]
    settings: Vec<String>,
    /// Keep only items mentioning one of these
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    /// Drop items mentioning any of these
    #[arg(long)]
    exclude: Vec<String>,
    #[arg(long)]
    min_length: Option<usize>,
    #[arg(long)]
    max_length: Option<usize>,
    /// Seconds between scheduled syncs
    #[arg(long, default_value_t = DEFAULT_SYNC_INTERVAL_SECS)]
    interval: i64,
}

impl AddSource {
    fn source_config(&self) -> Result<SourceConfig> {
        let mut config = SourceConfig::new();
        for (key, value) in [
            ("url", &self.url),
            ("channel_id", &self.channel_id),
            ("playlist_id", &self.playlist_id),
        ] {
            if let Some(value) = value {
                config.insert(key, value.as_str());
            }
        }
        for setting in &self.settings {
            let (key, value) = setting
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got '{setting}'"))?;
            config.insert(key.trim(), value.trim());
        }
        Ok(config)
    }

    fn filter_rules(&self) -> Option<FilterRules> {
        let rules = FilterRules {
            keywords: self.keywords.clone(),
            exclude: self.exclude.clone(),
            min_length: self.min_length,
            max_length: self.max_length,
        };
        (!rules.is_empty()).then_some(rules)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let registry = AdapterRegistry::with_options(
        Normalizer::new(config.summary_chars),
        &config.youtube_feed_base,
    );

    match args.command {
        Command::Types => {
            for source_type in registry.supported_types() {
                println!("{source_type}");
            }
            Ok(())
        }
        Command::Sources(cmd) => {
            let db = open_database(&args.db, &config, &config_dir).await?;
            run_sources(cmd, &db, &registry).await
        }
        Command::Sync { source, due } => {
            let db = open_database(&args.db, &config, &config_dir).await?;
            let client = FeedClient::with_user_agent(&config.user_agent)
                .context("Failed to build HTTP client")?
                .timeout(config.fetch_timeout())
                .max_bytes(config.max_feed_bytes);
            let syncer =
                Syncer::new(registry, db, client).max_concurrent(config.max_concurrent_syncs);
            run_sync(&syncer, source, due).await
        }
        Command::Contents { source, limit } => {
            let db = open_database(&args.db, &config, &config_dir).await?;
            let contents = db.get_contents(source, limit).await?;
            if contents.is_empty() {
                println!("No content.");
            }
            for content in contents {
                let flag = if content.is_read { ' ' } else { '*' };
                println!(
                    "{flag} [{}] {} ({})",
                    content.id,
                    strip_control_chars(&truncate_chars(&content.title, 80)),
                    content.url.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Command::Analyze {
            content_id,
            prompt,
            model,
        } => {
            let db = open_database(&args.db, &config, &config_dir).await?;
            let content = db
                .get_content(content_id)
                .await?
                .with_context(|| format!("Content {content_id} not found"))?;
            let mut analyst = Analyst::default();
            if let Some(prompt) = prompt {
                analyst.system_prompt = prompt;
            }
            if let Some(model) = model {
                analyst.model = model;
            }

            let client = OpenAiClient::new(reqwest::Client::new(), config.api_key())
                .with_base_url(&config.analysis_base_url)?;
            let completion = client.complete(&build_request(&analyst, &content)).await?;
            println!("{}", strip_control_chars(&completion.text));
            eprintln!("({} tokens)", completion.tokens_used);
            Ok(())
        }
    }
}

/// Opens `--db`, or the configured database (creating the config directory).
async fn open_database(
    db_arg: &Option<PathBuf>,
    config: &Config,
    config_dir: &Path,
) -> Result<Database> {
    let db_path = match db_arg {
        Some(path) => path.clone(),
        None => {
            if !config_dir.exists() {
                std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
            }
            config.database_path_in(config_dir)
        }
    };
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;

    match Database::open(db_path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: The database is locked by another process. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn run_sources(cmd: SourcesCommand, db: &Database, registry: &AdapterRegistry) -> Result<()> {
    match cmd {
        SourcesCommand::List => {
            let sources = db.get_sources(DEFAULT_OWNER).await?;
            if sources.is_empty() {
                println!("No sources. Add one with `readmaster sources add`.");
            }
            for s in sources {
                println!(
                    "[{}] {} ({}){} last sync: {}",
                    s.id,
                    s.name,
                    s.source_type,
                    if s.is_active { "" } else { " [disabled]" },
                    s.last_sync_status
                        .map(|st| st.to_string())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
        SourcesCommand::Add(add) => {
            let source_type = SourceType::from(add.source_type.as_str());
            let adapter = registry
                .get(&source_type)
                .with_context(|| format!("Unsupported source type '{source_type}'"))?;
            let config = add.source_config()?;
            adapter
                .check(&config)
                .with_context(|| format!("Invalid configuration for {source_type} source"))?;

            let created = db
                .create_source(&NewSource {
                    owner_id: DEFAULT_OWNER,
                    name: add.name.clone(),
                    source_type,
                    config,
                    filter_rules: add.filter_rules(),
                    sync_interval: add.interval,
                })
                .await?;
            println!("Added source {} ({})", created.id, created.name);
        }
        SourcesCommand::Remove { id } => {
            if !db.delete_source(id).await? {
                bail!("Source {id} not found");
            }
            println!("Removed source {id} and its content");
        }
        SourcesCommand::Enable { id } => set_active(db, id, true).await?,
        SourcesCommand::Disable { id } => set_active(db, id, false).await?,
    }
    Ok(())
}

async fn set_active(db: &Database, id: i64, active: bool) -> Result<()> {
    if !db.set_source_active(id, active).await? {
        bail!("Source {id} not found");
    }
    println!("Source {id} {}", if active { "enabled" } else { "disabled" });
    Ok(())
}

async fn run_sync(syncer: &Syncer<Database>, source: Option<i64>, due: bool) -> Result<()> {
    let results = match source {
        Some(id) => vec![(id, syncer.sync_by_id(id).await)],
        None if due => {
            syncer
                .sync_due(DEFAULT_OWNER, chrono::Utc::now().timestamp())
                .await?
        }
        None => syncer.sync_all(DEFAULT_OWNER).await?,
    };

    if results.is_empty() {
        println!("Nothing to sync.");
    }
    for (id, result) in &results {
        print_result(*id, result);
    }

    if let [(_, Err(SyncError::SourceNotFound(id)))] = results.as_slice() {
        bail!("Source {id} not found");
    }
    Ok(())
}

fn print_result(id: i64, result: &Result<SyncReport, SyncError>) {
    match result {
        Ok(report) => {
            println!(
                "[{id}] fetched {} saved {} (filtered {}, duplicates {}, failed {})",
                report.fetched, report.saved, report.filtered, report.duplicates, report.failed
            );
            if let Some(e) = &report.fetch_error {
                println!("[{id}]   fetch failed: {e}");
            }
        }
        Err(e) => println!("[{id}] error: {e}"),
    }
}
