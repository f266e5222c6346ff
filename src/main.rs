//! RateBot - peer ratings for community chat servers
//!
//! A CLI front end for the rating command group: submit content, rate it,
//! and query the averages kept in the ratings JSON file.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, I/O, bad arguments, etc.)
//!   2 - Command rejected (duplicate name, unknown submission, not allowed)

use anyhow::{Context, Result};
use ratebot::cli::{Args, Command, OutputFormat};
use ratebot::config::{Config, DEFAULT_CONFIG_FILE};
use ratebot::models::RawScores;
use ratebot::notify::{AnyNotifier, LogNotifier, WebhookConfig, WebhookNotifier};
use ratebot::ratings::{
    AccessPolicy, IdentityProvider, RatingBook, RatingService, StaticIdentity,
};
use ratebot::report::{self, EntrySummary};
use ratebot::store::JsonStore;
use ratebot::RatingError;
use serde_json::json;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes before logging so `[general] verbose` can take effect
    let (mut config, config_source) = load_config(&args)?;
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose))?;

    info!("RateBot v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {}", config_source);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ratebot.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the ratings file, announcement webhook, and deny-list.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so it reports where the config came from
/// instead of logging it.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("loaded from {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, format!("loaded from {}", DEFAULT_CONFIG_FILE))),
        Ok(None) => Ok((Config::default(), "defaults (no config file)".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), "defaults (config file unreadable)".to_string()))
        }
    }
}

/// Pick the announcement sink from configuration.
fn build_notifier(config: &Config) -> Result<AnyNotifier> {
    match config.notify.webhook_url {
        Some(ref url) => {
            debug!("Announcing new submissions via webhook");
            let notifier = WebhookNotifier::new(WebhookConfig {
                url: Some(url.clone()),
                guild_id: config.notify.guild_id.clone(),
                timeout_seconds: config.notify.timeout_seconds,
            })?;
            Ok(AnyNotifier::Webhook(notifier))
        }
        None => Ok(AnyNotifier::Log(LogNotifier)),
    }
}

/// Run one command. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let store = JsonStore::new(&config.store.path);
    let book = RatingBook::open(store)
        .with_context(|| format!("Failed to open {}", config.store.path.display()))?;
    let policy = AccessPolicy {
        drop_deny: config.access.drop_deny.clone(),
    };
    let notifier = build_notifier(&config)?;
    let service = RatingService::new(book, notifier, &config.notify.channel, policy);
    let caller = StaticIdentity::new(args.identity().unwrap_or_default());

    let Some(command) = args.command.clone() else {
        return Ok(0);
    };

    match execute(&service, &caller, command, args.format).await {
        Ok(()) => Ok(0),
        Err(e @ (RatingError::DuplicateName(_)
        | RatingError::EntryNotFound(_)
        | RatingError::Forbidden(_))) => {
            warn!("Command rejected: {}", e);
            eprintln!("⛔ {}", e);
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}

/// Dispatch a command against the service and print its result.
async fn execute(
    service: &RatingService<AnyNotifier>,
    caller: &StaticIdentity,
    command: Command,
    format: OutputFormat,
) -> ratebot::Result<()> {
    let book = service.book();

    match command {
        Command::New { name, content } => {
            let created = service.submit_new(caller, &name, &content).await?;
            match created.notification {
                Ok(Some(link)) => println!(
                    "`{}` has been submitted for review by your peers. See {}",
                    created.entry.name, link
                ),
                Ok(None) => println!(
                    "`{}` has been submitted for review by your peers.",
                    created.entry.name
                ),
                Err(e) => println!(
                    "`{}` has been submitted, but the announcement failed: {}",
                    created.entry.name, e
                ),
            }
        }
        Command::Submit {
            name,
            instrumentals,
            vocals,
            lyrics,
            emotion,
            comment,
        } => {
            let scores = RawScores::new(instrumentals, vocals, lyrics, emotion);
            let entry = service.submit_rating(caller, &name, &scores, &comment)?;
            println!(
                "Thank you for rating `{}`! Your response has been recorded.",
                entry.name
            );
        }
        Command::Stats { extreme, field } => {
            let result = book.extremal(field, extreme);
            match format {
                OutputFormat::Text => {
                    println!("{}", report::stats_sentence(extreme, field, result.as_ref()))
                }
                OutputFormat::Json => {
                    let value = result.map(|(name, value)| json!({ "name": name, "value": value }));
                    println!("{}", report::generate_json(&value)?);
                }
            }
        }
        Command::Comments { name } => {
            let comments = book.comments(&name)?;
            match format {
                OutputFormat::Text => println!("{}", report::comments_text(name.trim(), &comments)),
                OutputFormat::Json => println!("{}", report::generate_json(&comments)?),
            }
        }
        Command::Pending => {
            let names = service.pending(caller);
            match format {
                OutputFormat::Text => {
                    print!("{}", report::pending_text(&caller.rater_identity(), &names))
                }
                OutputFormat::Json => println!("{}", report::generate_json(&names)?),
            }
        }
        Command::Show { name } => {
            let entry = book
                .get(&name)
                .ok_or_else(|| RatingError::EntryNotFound(name.trim().to_string()))?;
            match format {
                OutputFormat::Text => print!("{}", report::entry_summary(&entry)),
                OutputFormat::Json => {
                    println!("{}", report::generate_json(&EntrySummary::from(&entry))?)
                }
            }
        }
        Command::Chart { field, width } => {
            let rows = report::chart_rows(&book.snapshot(), field, width);
            match format {
                OutputFormat::Text => print!("{}", report::render_chart(field, &rows, 40)),
                OutputFormat::Json => println!("{}", report::generate_json(&rows)?),
            }
        }
        Command::Drop { name } => {
            let entry = service.drop_entry(caller, &name)?;
            println!("Dropped `{}` and its {} ratings.", entry.name, entry.ratings.len());
        }
        Command::Download { output } => {
            let document = book.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &document)
                        .map_err(|e| RatingError::Persistence { path: path.clone(), source: e })?;
                    println!("✅ Ratings exported to {}", path.display());
                }
                None => println!("{}", document),
            }
        }
        Command::Suggest { current } => {
            let names = book.suggest(&current);
            match format {
                OutputFormat::Text => {
                    for name in &names {
                        println!("{}", name);
                    }
                }
                OutputFormat::Json => println!("{}", report::generate_json(&names)?),
            }
        }
    }

    Ok(())
}
