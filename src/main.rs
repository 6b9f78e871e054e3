//! Command-line front end.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Load a `.env` file if present.
//! 3. Load [`AppConfig`] from disk and layer `AGRI_*` variables over it.
//! 4. Build the [`TranslationService`] and run one subcommand.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;

use agri_translate::{
    audio::{stop_channel, StopHandle},
    config::{AppConfig, AppPaths},
    registry::EndpointOverrides,
    Origin, TranslationService,
};

#[derive(Debug, Parser)]
#[command(name = "agri-translate", version, about = "English ↔ Giriama farming translator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translate text and record it in history.
    Translate {
        text: String,
        #[arg(long, default_value = "en")]
        from: String,
        #[arg(long, default_value = "gir")]
        to: String,
        /// Mark the entry as coming from the dashboard.
        #[arg(long, conflicts_with = "demo")]
        dashboard: bool,
        /// Mark the entry as a landing-page demo (never sent remotely).
        #[arg(long)]
        demo: bool,
    },
    /// Record from the microphone and print the transcript.
    /// Press Enter or Ctrl-C to stop early.
    Transcribe {
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// Synthesize speech for text.
    Speak {
        text: String,
        #[arg(long, default_value = "gir")]
        lang: String,
        /// Play the audio instead of printing a data URL.
        #[arg(long)]
        play: bool,
    },
    /// Inspect or edit the translation history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Merge endpoint overrides into the saved settings.
    Configure {
        /// JSON object, e.g. `{"giriamaTtsUrl":"http://host/tts"}`.
        #[arg(long)]
        json: String,
    },
    /// Show configuration locations.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    List {
        #[arg(long, conflicts_with = "demo")]
        dashboard: bool,
        #[arg(long)]
        demo: bool,
    },
    Delete {
        id: i64,
    },
    Clear,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Path,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = dotenvy::dotenv() {
        log::debug!("no .env loaded: {e}");
    }

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if AppConfig::is_first_run() {
        log::info!("first run: using default settings");
    }
    config.apply_env(|name| std::env::var(name).ok());

    let service = || TranslationService::from_config(&config);

    match cli.command {
        Command::Translate {
            text,
            from,
            to,
            dashboard,
            demo,
        } => {
            let origin = if dashboard {
                Origin::Dashboard
            } else if demo {
                Origin::Demo
            } else {
                Origin::Other
            };
            let translated = service()?
                .translate_and_record(&text, &from, &to, origin)
                .await?;
            println!("{translated}");
        }

        Command::Transcribe { lang } => {
            let (handle, signal) = stop_channel();
            let watcher = tokio::spawn(stop_on_enter_or_ctrl_c(handle));
            eprintln!("Listening… press Enter to stop.");
            let result = service()?.transcribe(&lang, signal).await;
            watcher.abort();
            println!("{}", result?);
        }

        Command::Speak { text, lang, play } => {
            let service = service()?;
            let audio = service.synthesize(&text, &lang).await?;
            log::info!("speech from {:?} ({} bytes)", audio.source, audio.bytes.len());
            if play {
                let playback = service.play(&audio);
                tokio::select! {
                    result = playback.wait() => result?,
                    _ = tokio::signal::ctrl_c() => {}
                }
            } else {
                println!("{}", audio.to_data_url());
            }
        }

        Command::History { action } => {
            let service = service()?;
            let history = service.history();
            match action {
                HistoryAction::List { dashboard, demo } => {
                    let items = if dashboard {
                        history.dashboard_entries()?
                    } else if demo {
                        history.demo_entries()?
                    } else {
                        history.list()?
                    };
                    for item in items {
                        println!(
                            "{}\t{}\t{} → {}\t{}\t{}",
                            item.id,
                            item.timestamp.format("%Y-%m-%d %H:%M"),
                            item.source_lang,
                            item.target_lang,
                            item.source_text,
                            item.translated_text
                        );
                    }
                }
                HistoryAction::Delete { id } => {
                    if !history.delete(id)? {
                        anyhow::bail!("no history entry with id {id}");
                    }
                }
                HistoryAction::Clear => history.clear()?,
            }
        }

        Command::Configure { json } => configure(&json)?,

        Command::Config { action: ConfigAction::Path } => {
            let paths = AppPaths::new();
            println!("settings: {}", paths.settings_file.display());
            println!("store:    {}", config.store_dir().display());
            println!("models:   {}", paths.models_dir.display());
        }
    }
    Ok(())
}

/// Merge `json` into the saved settings.  Takes effect on the next run.
fn configure(json: &str) -> anyhow::Result<()> {
    let overrides: EndpointOverrides =
        serde_json::from_str(json).context("configure expects a JSON object of endpoint overrides")?;
    if overrides.is_empty() {
        log::warn!("configure: no recognised fields in {json}");
        return Ok(());
    }

    let paths = AppPaths::new();
    let mut saved = AppConfig::load_from(&paths.settings_file)?;
    saved.endpoints.merge(&overrides);
    saved.save_to(&paths.settings_file)?;
    log::info!("configure: saved to {}", paths.settings_file.display());
    Ok(())
}

async fn stop_on_enter_or_ctrl_c(handle: StopHandle) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        _ = lines.next_line() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    handle.stop();
}
