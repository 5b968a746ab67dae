use std::path::PathBuf;
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use mediaseek::search::PAGE_SIZE;
use mediaseek::utils::format_duration;
use mediaseek::{AppConfig, AppState, QualityHeight, SearchOutcome};

#[derive(Parser)]
#[command(name = "mediaseek", version, about = "Search music and download media from social platforms")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session id used for search state
    #[arg(long, global = true, default_value_t = 0)]
    session: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search YouTube, Spotify and lyrics videos
    Search { query: Vec<String> },
    /// Print the platform a URL belongs to
    Detect { url: String },
    /// Probe a media URL without downloading
    Info { url: String },
    /// List the qualities offered for a media URL
    Qualities { url: String },
    /// Download a video, or its audio with --audio
    Download {
        url: String,
        #[arg(long)]
        audio: bool,
        /// Maximum video height, e.g. 720
        #[arg(long)]
        quality: Option<u32>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Identify the song in an audio or video sample
    Identify {
        file: PathBuf,
        /// Sample length in seconds, used to centre the snippet
        #[arg(long)]
        duration: Option<f64>,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(Some(path)),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            AppConfig::default()
        }
    };

    let state = AppState::new(config).context("failed to initialise application state")?;

    match cli.command {
        Commands::Search { query } => match state.search(cli.session, &query.join(" ")).await? {
            SearchOutcome::Downloadable { source, tracks, spotify_hint } => {
                println!("Results from {}:", source);
                for (index, track) in tracks.iter().take(PAGE_SIZE).enumerate() {
                    println!("{:>2}. {} - {} ({})  {}", index + 1, track.title, track.artist, format_duration(track.duration), track.url);
                }
                if let Some(hint) = spotify_hint {
                    println!("Spotify: {}", hint.url);
                }
            }
            SearchOutcome::LinkOnly(track) => println!("Only on Spotify: {} - {}  {}", track.title, track.artist, track.url),
            SearchOutcome::NothingFound => println!("Nothing found"),
        },
        Commands::Detect { url } => {
            println!("{}", state.detect(&url));
        }
        Commands::Info { url } => match state.media_info(&url).await? {
            Some(info) => print_json(&info)?,
            None => anyhow::bail!("could not fetch info for {}", url),
        },
        Commands::Qualities { url } => {
            print_json(&state.qualities(&url).await?)?;
        }
        Commands::Download { url, audio, quality, output } => {
            let quality = quality.map(QualityHeight::Pixels);
            match state.download(&url, audio, quality, output).await? {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("download failed for {}", url),
            }
        }
        Commands::Identify { file, duration } => match state.identify(&file, duration).await? {
            Some(found) => print_json(&found)?,
            None => anyhow::bail!("no song recognized in {}", file.display()),
        },
    }

    state.shutdown().await;
    Ok(())
}
