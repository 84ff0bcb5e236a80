//! Interactive grounded chat on stdin/stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gaia_core::{ChatSession, Citation, LocationState, Roster, CHAT_FAILURE_MESSAGE};
use gaia_genai::{pcm, GenAiClient};
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];

/// Reply text followed by its sources, one per line under "Fontes:".
pub(crate) fn render_reply(text: &str, citations: &[Citation]) -> String {
    let mut out = text.trim_end().to_string();
    if !citations.is_empty() {
        out.push_str("\n\nFontes:");
        for c in citations {
            out.push_str(&format!("\n  - {} <{}>", c.display_title(), c.uri));
        }
    }
    out
}

pub(crate) async fn run_chat(
    client: &GenAiClient,
    roster: Arc<Roster>,
    location: LocationState,
    speak_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut session = ChatSession::new(roster, location);
    if let Some(advisory) = session.location_advisory() {
        eprintln!("{advisory}");
    }
    if let Some(dir) = &speak_dir {
        tokio::fs::create_dir_all(dir).await?;
    }
    println!("Olá! Sou a Gaia. Pergunte sobre descarte de lixo eletrônico (\"sair\" para encerrar).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut replies = 0_usize;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if EXIT_WORDS.contains(&line.to_lowercase().as_str()) {
            break;
        }
        let Some(request) = session.prepare(line) else {
            continue;
        };

        match client.generate_grounded(&request).await {
            Ok(reply) => {
                println!("{}\n", render_reply(&reply.text, &reply.citations));
                session.record_reply(reply.text.clone(), reply.citations);
                replies += 1;
                if let Some(dir) = &speak_dir {
                    speak_reply(client, &reply.text, dir, replies).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                session.record_failure();
                println!("{CHAT_FAILURE_MESSAGE}\n");
            }
        }
    }

    tracing::info!(messages = session.history().len(), "chat ended");
    Ok(())
}

/// Speech for a reply is best-effort; failures are logged and the chat goes on.
async fn speak_reply(client: &GenAiClient, text: &str, dir: &Path, n: usize) {
    let path = dir.join(format!("resposta-{n:03}.pcm"));
    match client.text_to_speech(text).await {
        Ok(audio) => {
            if let Err(e) = tokio::fs::write(&path, pcm::encode_i16(&audio.samples)).await {
                tracing::warn!(error = %e, path = %path.display(), "failed to write speech");
            } else {
                tracing::info!(path = %path.display(), secs = audio.duration_secs(), "speech written");
            }
        }
        Err(e) => tracing::warn!(error = %e, "speech synthesis failed"),
    }
}
