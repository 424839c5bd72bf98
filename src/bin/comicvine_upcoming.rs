use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use comicvine_upcoming::app::{LibraryAggregator, UpcomingState};
use comicvine_upcoming::catalog::ComicVineHttpClient;
use comicvine_upcoming::config::ConfigLoader;
use comicvine_upcoming::dates::parse_cli_date;
use comicvine_upcoming::domain::ApiKey;
use comicvine_upcoming::error::UpcomingError;
use comicvine_upcoming::events::TracingSink;
use comicvine_upcoming::output::{JsonOutput, OutputMode, TextOutput, render_state};
use comicvine_upcoming::store::{JsonFileStore, Preferences};

#[derive(Parser)]
#[command(name = "comicvine-upcoming")]
#[command(about = "Upcoming comic releases for your library, from ComicVine")]
#[command(version, author)]
struct Cli {
    /// Preferences file holding the API key and volume cache
    #[arg(long, global = true)]
    store: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage the ComicVine API key")]
    Key(KeyArgs),
    #[command(about = "Manage the volume cache")]
    Cache(CacheArgs),
    #[command(about = "Show the upcoming release calendar")]
    Upcoming(UpcomingArgs),
}

#[derive(Args)]
struct KeyArgs {
    #[command(subcommand)]
    command: KeyCommand,
}

#[derive(Subcommand)]
enum KeyCommand {
    #[command(about = "Save an API key")]
    Set { key: String },
    #[command(about = "Show the saved API key (masked)")]
    Show,
    #[command(about = "Remove the saved API key")]
    Clear,
    #[command(about = "Test a key against ComicVine (defaults to the saved key)")]
    Test { key: Option<String> },
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Forget every cached series to volume match")]
    Clear,
}

#[derive(Args)]
struct UpcomingArgs {
    #[arg(long)]
    config: Option<String>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<String>,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<UpcomingError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &UpcomingError) -> u8 {
    match error {
        UpcomingError::MissingConfig
        | UpcomingError::ConfigRead(_)
        | UpcomingError::ConfigParse(_)
        | UpcomingError::MissingApiKey
        | UpcomingError::EmptyApiKey => 2,
        UpcomingError::CatalogHttp(_)
        | UpcomingError::CatalogStatus { .. }
        | UpcomingError::CatalogDecode(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store_path = match cli.store {
        Some(path) => path,
        None => JsonFileStore::default_path()?,
    };

    match cli.command {
        Commands::Key(args) => {
            // Writing commands must work even when the file is corrupt.
            let store = match args.command {
                KeyCommand::Set { .. } | KeyCommand::Clear => {
                    JsonFileStore::open_recovering(store_path)?
                }
                KeyCommand::Show | KeyCommand::Test { .. } => JsonFileStore::open(store_path)?,
            };
            run_key(args.command, Preferences::new(store))
        }
        Commands::Cache(args) => match args.command {
            CacheCommand::Clear => {
                let preferences = Preferences::new(JsonFileStore::open_recovering(store_path)?);
                let removed = preferences.clear_volume_cache()?;
                println!("Cache cleared ({removed} series)");
                Ok(())
            }
        },
        Commands::Upcoming(args) => {
            run_upcoming(args, Preferences::new(JsonFileStore::open(store_path)?))
        }
    }
}

fn run_key(command: KeyCommand, preferences: Preferences<JsonFileStore>) -> miette::Result<()> {
    match command {
        KeyCommand::Set { key } => {
            let key: ApiKey = key.parse()?;
            preferences.set_api_key(&key)?;
            println!("Saved API key {}", key.masked());
            Ok(())
        }
        KeyCommand::Show => {
            match preferences.api_key() {
                Some(key) => println!("{}", key.masked()),
                None => println!("No API key set"),
            }
            Ok(())
        }
        KeyCommand::Clear => {
            preferences.clear_api_key()?;
            println!("API key removed");
            Ok(())
        }
        KeyCommand::Test { key } => {
            if key.is_none() {
                preferences.require_api_key()?;
            }
            let catalog = ComicVineHttpClient::new()?;
            let aggregator = LibraryAggregator::new(catalog, preferences);
            let status = aggregator.test_connection(key.as_deref());
            if status.is_connected() {
                println!("✓ {status}");
                Ok(())
            } else {
                Err(miette::Report::msg(format!("✗ {status}")))
            }
        }
    }
}

fn run_upcoming(args: UpcomingArgs, preferences: Preferences<JsonFileStore>) -> miette::Result<()> {
    let today = match args.today.as_deref() {
        Some(value) => parse_cli_date(value)?,
        None => chrono::Local::now().date_naive(),
    };
    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let resolved = ConfigLoader::resolve(args.config.as_deref());
    let http = resolved
        .as_ref()
        .map(|config| config.http.clone())
        .unwrap_or_default();
    let catalog = ComicVineHttpClient::with_settings(&http)?;
    let mut aggregator = LibraryAggregator::new(catalog, preferences);

    let state = match resolved {
        Ok(config) => {
            aggregator = aggregator
                .with_window(config.window)
                .with_chunk_size(config.chunk_size);
            if matches!(mode, OutputMode::Text) {
                eprint!("{}", render_state(&UpcomingState::Loading, today));
            }
            aggregator.aggregate_from(&config, today, &TracingSink)
        }
        Err(err) if aggregator.preferences().api_key().is_none() => {
            tracing::debug!(error = %err, "config unavailable and no key set");
            UpcomingState::NoApiKey
        }
        Err(err) => return Err(err.into()),
    };

    print_state(&state, mode, today)
}

fn print_state(state: &UpcomingState, mode: OutputMode, today: NaiveDate) -> miette::Result<()> {
    match mode {
        OutputMode::Json => JsonOutput::print_state(state).into_diagnostic(),
        OutputMode::Text => TextOutput::print_state(state, today).into_diagnostic(),
    }
}
