//! `gaia live`: a voice session driven from a recorded file.
//!
//! The input file stands in for the microphone and is streamed in real time;
//! model speech is laid onto a wall-clock timeline that is written out when
//! the session ends.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use gaia_core::{AppConfig, LocationState, Roster};
use gaia_genai::pcm::{self, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};
use gaia_live::{
    AgentUpdate, AudioCapture, AudioChunk, AudioOutput, ConnectionState, LiveConfig, LiveError,
    VoiceAgent,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

/// Samples per microphone frame.
pub(crate) const FRAME_SAMPLES: usize = 4096;

/// Split 16 kHz PCM16 into float frames of [`FRAME_SAMPLES`].
pub(crate) fn frames_from_pcm(samples: &[i16]) -> Vec<Vec<f32>> {
    samples
        .chunks(FRAME_SAMPLES)
        .map(|chunk| chunk.iter().map(|&s| f32::from(s) / 32_768.0).collect())
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_offset(secs: f64) -> usize {
    (secs.max(0.0) * f64::from(OUTPUT_SAMPLE_RATE)).round() as usize
}

/// Output device that mixes scheduled chunks onto an in-memory timeline.
struct TimelineOutput {
    started: Instant,
    timeline: Arc<Mutex<Vec<i16>>>,
}

impl AudioOutput for TimelineOutput {
    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn play_at(&mut self, chunk: &AudioChunk, at: f64) -> Result<(), LiveError> {
        if chunk.sample_rate != OUTPUT_SAMPLE_RATE {
            return Err(LiveError::Output(format!(
                "unsupported sample rate {}",
                chunk.sample_rate
            )));
        }
        let start = sample_offset(at);
        let end = start + chunk.samples.len();
        let mut timeline = self
            .timeline
            .lock()
            .map_err(|_| LiveError::Output("playback timeline poisoned".to_string()))?;
        if timeline.len() < end {
            timeline.resize(end, 0);
        }
        timeline[start..end].copy_from_slice(&chunk.samples);
        Ok(())
    }

    /// Anything scheduled past the current instant has not been heard yet.
    fn stop_all(&mut self) {
        let now = sample_offset(self.current_time());
        if let Ok(mut timeline) = self.timeline.lock() {
            timeline.truncate(now);
        }
    }
}

struct FileCapture {
    feeder: AbortHandle,
}

impl AudioCapture for FileCapture {
    fn stop(&mut self) {
        self.feeder.abort();
    }
}

pub(crate) async fn run_live(
    config: &AppConfig,
    roster: Arc<Roster>,
    location: LocationState,
    input: &Path,
    out: &Path,
    linger: Duration,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let frames = frames_from_pcm(&pcm::decode_i16(&bytes)?);
    tracing::info!(frames = frames.len(), path = %input.display(), "loaded microphone input");

    let mut agent = VoiceAgent::new(LiveConfig::from_app_config(config)?, roster, location);
    if let Some(advisory) = agent.location_advisory() {
        eprintln!("{advisory}");
    }
    let mut updates = agent.subscribe();
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                AgentUpdate::State(state) => tracing::info!(?state, "voice agent"),
                AgentUpdate::UserTranscript(text) => tracing::debug!(%text, "user said"),
                AgentUpdate::AgentTranscript(text) => tracing::debug!(%text, "agent said"),
                AgentUpdate::Turn(_) => {}
            }
        }
    });

    let (frames_tx, mut frames_rx) = mpsc::channel(4);
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let (ready_tx, ready_rx) = oneshot::channel::<()>();
    let feeder = tokio::spawn(async move {
        if ready_rx.await.is_err() {
            return;
        }
        let pace = Duration::from_secs_f64(pcm::duration_secs(FRAME_SAMPLES, INPUT_SAMPLE_RATE));
        let feed = async move {
            for frame in frames {
                if frames_tx.send(frame).await.is_err() {
                    return;
                }
                tokio::time::sleep(pace).await;
            }
            drop(frames_tx);
            tokio::time::sleep(linger).await;
        };
        tokio::select! {
            () = feed => {}
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
            }
        }
        let _ = stop_tx.send(());
    });

    let timeline = Arc::new(Mutex::new(Vec::new()));
    let output = TimelineOutput {
        started: Instant::now(),
        timeline: Arc::clone(&timeline),
    };
    let capture = FileCapture {
        feeder: feeder.abort_handle(),
    };
    agent.start(Box::new(output), Box::new(capture)).await?;
    let _ = ready_tx.send(());

    let outcome = agent.run(&mut frames_rx, &mut stop_rx).await;

    let samples = {
        let guard = timeline
            .lock()
            .map_err(|_| anyhow::anyhow!("playback timeline poisoned"))?;
        guard.clone()
    };
    tokio::fs::write(out, pcm::encode_i16(&samples))
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(
        path = %out.display(),
        secs = pcm::duration_secs(samples.len(), OUTPUT_SAMPLE_RATE),
        "playback written"
    );

    for turn in agent.history() {
        println!("Você: {}\nGaia: {}\n", turn.user, turn.agent);
    }

    match outcome? {
        ConnectionState::Error => anyhow::bail!("live session ended with an error"),
        _ => Ok(()),
    }
}
