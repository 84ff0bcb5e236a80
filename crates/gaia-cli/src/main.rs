mod chat;
mod live;
mod location;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gaia_core::{
    build_collectors_context, default_roster, load_collectors, resolve_location, AppConfig, Roster,
    DEFAULT_IMAGE_PROMPT, IMAGE_FAILURE_MESSAGE, IMAGE_PROMPT_MISSING_MESSAGE,
};
use gaia_genai::{pcm, GenAiClient, GenAiConfig};
use tracing_subscriber::EnvFilter;

use crate::location::LocationArgs;

#[derive(Debug, Parser)]
#[command(name = "gaia")]
#[command(about = "Gaia e-waste assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the collector context block, ranked by distance when a location is given
    Collectors {
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Identify e-waste in a photo
    Analyze {
        /// Image file (JPEG, PNG, WebP, ...)
        image: PathBuf,
        /// Replace the default identification prompt
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Interactive grounded chat
    Chat {
        #[command(flatten)]
        location: LocationArgs,
        /// Also synthesise every reply as raw PCM into this directory
        #[arg(long)]
        speak_dir: Option<PathBuf>,
    },
    /// Synthesise speech as raw 24 kHz s16le PCM
    Speak {
        text: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Voice session fed from a recorded 16 kHz s16le file
    Live {
        #[arg(long)]
        input: PathBuf,
        /// Where to write the model's speech (24 kHz s16le)
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        location: LocationArgs,
        /// Seconds to keep listening after the input ends
        #[arg(long, default_value = "10")]
        linger_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = gaia_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let roster = Arc::new(load_roster(&config)?);
    tracing::debug!(collectors = roster.len(), env = %config.env, "roster loaded");

    match cli.command {
        Commands::Collectors { location } => {
            let state = resolve_location(&location).await;
            println!(
                "{}",
                build_collectors_context(roster.collectors(), state.location())
            );
        }
        Commands::Analyze { image, prompt } => {
            let prompt = analysis_prompt(prompt.as_deref())?;
            let client = build_client(&config)?;
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("failed to read {}", image.display()))?;
            let mime = image_mime(&image)?;
            match client.analyze_image(&bytes, &mime, prompt).await {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    tracing::error!(error = %e, "image analysis failed");
                    println!("{IMAGE_FAILURE_MESSAGE}");
                }
            }
        }
        Commands::Chat {
            location,
            speak_dir,
        } => {
            let client = build_client(&config)?;
            let state = resolve_location(&location).await;
            chat::run_chat(&client, roster, state, speak_dir).await?;
        }
        Commands::Speak { text, out } => {
            let client = build_client(&config)?;
            let audio = client.text_to_speech(&text).await?;
            tokio::fs::write(&out, pcm::encode_i16(&audio.samples))
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "{} ({:.1}s, {} Hz s16le)",
                out.display(),
                audio.duration_secs(),
                audio.sample_rate
            );
        }
        Commands::Live {
            input,
            out,
            location,
            linger_secs,
        } => {
            let state = resolve_location(&location).await;
            live::run_live(
                &config,
                roster,
                state,
                &input,
                &out,
                Duration::from_secs(linger_secs),
            )
            .await?;
        }
    }

    Ok(())
}

fn load_roster(config: &AppConfig) -> anyhow::Result<Roster> {
    let roster = match &config.collectors_path {
        Some(path) => load_collectors(path)?,
        None => default_roster()?,
    };
    Ok(roster)
}

fn build_client(config: &AppConfig) -> anyhow::Result<GenAiClient> {
    Ok(GenAiClient::new(GenAiConfig::from_app_config(config)?)?)
}

/// The user's prompt, or the default one when none was given. Blank prompts are refused.
fn analysis_prompt(prompt: Option<&str>) -> anyhow::Result<&str> {
    let prompt = prompt.unwrap_or(DEFAULT_IMAGE_PROMPT);
    anyhow::ensure!(!prompt.trim().is_empty(), IMAGE_PROMPT_MISSING_MESSAGE);
    Ok(prompt)
}

/// MIME type guessed from the file extension; only images are accepted.
fn image_mime(path: &Path) -> anyhow::Result<String> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    anyhow::ensure!(
        mime.type_() == mime_guess::mime::IMAGE,
        "{} does not look like an image ({mime})",
        path.display()
    );
    Ok(mime.essence_str().to_string())
}
