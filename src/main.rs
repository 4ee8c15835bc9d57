//! Terminal front end for media-dl.
//!
//! Reads the URL and platform from the command line, prints the status log
//! as it grows and renders history records with their file links.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use media_dl::{
    Config, Event, HistoryRecord, HttpJobClient, MediaDownloader, Platform, Severity, StatusEvent,
    run_with_shutdown,
};
use tracing_subscriber::EnvFilter;

/// Command-line interface
#[derive(Parser)]
#[command(name = "media-dl")]
#[command(about = "Download media through a media-dl backend")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, env = "MEDIA_DL_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "MEDIA_DL_BACKEND")]
    backend: Option<String>,

    /// History file (overrides the config file)
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a URL and wait for the backend to finish
    Download {
        /// Platform identifier (see `platforms`)
        platform: String,
        /// Media URL
        url: String,
    },

    /// Show the download history, newest first
    History {
        /// Remove every record instead
        #[arg(long)]
        clear: bool,
    },

    /// List supported platforms with their input hints
    Platforms,

    /// Print the backend link for a downloaded file
    Link {
        /// Platform identifier
        platform: String,
        /// File name as reported by the backend
        filename: String,
    },

    /// Save a downloaded file from the backend
    Fetch {
        /// Platform identifier
        platform: String,
        /// File name as reported by the backend
        filename: String,
        /// Destination directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "media_dl=debug" } else { "media_dl=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> media_dl::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(base_url) = &cli.backend {
        config.backend.base_url = base_url.clone();
    }
    if let Some(path) = &cli.history {
        config.history.path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> media_dl::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Download { platform, url } => {
            let downloader = MediaDownloader::new(config)?;
            download(&downloader, &platform, &url).await
        }
        Commands::History { clear } => {
            let downloader = MediaDownloader::new(config)?;
            if clear {
                downloader.clear_history().await?;
                println!("History cleared");
                return Ok(());
            }
            let history = downloader.history().await;
            if history.is_empty() {
                println!("No downloads yet");
            }
            for record in &history {
                print_record(&downloader, record);
            }
            Ok(())
        }
        Commands::Platforms => {
            let downloader = MediaDownloader::new(config)?;
            for platform in downloader.registry().platforms() {
                println!(
                    "{:<14} {:<16} {}",
                    platform.id(),
                    platform.label(),
                    downloader.hint(platform)
                );
            }
            Ok(())
        }
        Commands::Link { platform, filename } => {
            let platform: Platform = platform.parse()?;
            let downloader = MediaDownloader::new(config)?;
            println!("{}", downloader.file_link(platform, &filename));
            Ok(())
        }
        Commands::Fetch {
            platform,
            filename,
            output,
        } => {
            let platform: Platform = platform.parse()?;
            let client = HttpJobClient::new(&config.backend)?;
            let path = client.save_file(platform, &filename, &output).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
    }
}

async fn download(downloader: &MediaDownloader, platform: &str, url: &str) -> media_dl::Result<()> {
    let mut events = downloader.subscribe();

    let download = downloader.download_by_id(url, platform);
    let shutdown = run_with_shutdown(downloader.clone());
    tokio::pin!(download, shutdown);

    let mut interrupted = false;
    let result = loop {
        tokio::select! {
            result = &mut download => break result,
            Ok(event) = events.recv() => print_event(&event),
            _ = &mut shutdown, if !interrupted => interrupted = true,
        }
    };

    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    let record = result?;
    print_record(downloader, &record);
    Ok(())
}

fn print_event(event: &Event) {
    if let Event::Status(status) = event {
        print_status(status);
    }
}

fn print_status(status: &StatusEvent) {
    let tag = match status.severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Error => "error",
    };
    println!(
        "[{}] {:>5}  {}",
        status.timestamp.format("%H:%M:%S"),
        tag,
        status.message
    );
}

fn print_record(downloader: &MediaDownloader, record: &HistoryRecord) {
    println!(
        "{}  {} ({})",
        record.completed_at.format("%Y-%m-%d %H:%M"),
        record.title,
        record.platform.label()
    );
    for file in &record.files {
        println!("    {}", downloader.file_link(record.platform, file));
    }
}
