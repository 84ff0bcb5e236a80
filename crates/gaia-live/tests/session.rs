use std::future::Future;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use gaia_core::{LocationState, Roster, UserLocation};
use gaia_genai::pcm;
use gaia_live::{
    AudioCapture, AudioChunk, AudioOutput, ConnectionState, LiveConfig, LiveError, LiveEvent,
    LiveSession, TurnRecord, VoiceAgent,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerSocket = WebSocketStream<TcpStream>;

async fn spawn_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(ServerSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let socket = accept_async(stream).await.expect("handshake");
        handler(socket).await;
    });
    format!("ws://{addr}/live")
}

fn config(url: String) -> LiveConfig {
    LiveConfig {
        api_key: "test-key".to_string(),
        url,
        model: "gemini-live-test".to_string(),
        voice: "Zephyr".to_string(),
        setup_timeout_secs: 2,
    }
}

async fn next_json(socket: &mut ServerSocket) -> serde_json::Value {
    loop {
        let msg = socket.next().await.expect("frame").expect("ok frame");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_str(msg.to_text().expect("utf8")).expect("json");
        }
    }
}

async fn send_json(socket: &mut ServerSocket, value: serde_json::Value) {
    socket
        .send(Message::text(value.to_string()))
        .await
        .expect("send");
}

fn speech(samples: &[i16]) -> String {
    pcm::to_base64(&pcm::encode_i16(samples))
}

#[tokio::test]
async fn session_handshake_events_and_close() {
    let (setup_tx, setup_rx) = oneshot::channel();
    let (audio_tx, audio_rx) = oneshot::channel();
    let url = spawn_server(move |mut socket| async move {
        let setup = next_json(&mut socket).await;
        let _ = setup_tx.send(setup);
        socket
            .send(Message::binary(br#"{"setupComplete":{}}"#.to_vec()))
            .await
            .expect("ack");

        send_json(
            &mut socket,
            serde_json::json!({
                "serverContent": {
                    "inputTranscription": {"text": "olá"},
                    "outputTranscription": {"text": "Oi!"},
                    "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": speech(&[5, 6, 7])}}]},
                    "turnComplete": true
                }
            }),
        )
        .await;

        let audio = next_json(&mut socket).await;
        let _ = audio_tx.send(audio);
        socket.close(None).await.expect("close");
    })
    .await;

    let mut session = LiveSession::connect(&config(url), "instrução")
        .await
        .expect("connects");
    let setup = setup_rx.await.expect("setup seen");
    assert_eq!(setup["setup"]["model"], "models/gemini-live-test");
    assert_eq!(
        setup["setup"]["systemInstruction"]["parts"][0]["text"],
        "instrução"
    );

    assert_eq!(
        session.next_event().await,
        Some(LiveEvent::InputTranscript("olá".to_string()))
    );
    assert_eq!(
        session.next_event().await,
        Some(LiveEvent::OutputTranscript("Oi!".to_string()))
    );
    assert_eq!(
        session.next_event().await,
        Some(LiveEvent::Audio(AudioChunk {
            samples: vec![5, 6, 7],
            sample_rate: 24_000
        }))
    );
    assert_eq!(session.next_event().await, Some(LiveEvent::TurnComplete));

    let sent = session.send_audio(&[0.0; 4096]).await.expect("open");
    assert!(sent);
    let audio = audio_rx.await.expect("audio seen");
    assert_eq!(audio["realtimeInput"]["audio"]["mimeType"], "audio/pcm;rate=16000");

    assert_eq!(session.next_event().await, Some(LiveEvent::Closed));
    session.close().await;
    session.close().await;
    assert!(session.is_closed());
    assert!(matches!(
        session.send_audio(&[0.1]).await,
        Err(LiveError::Closed)
    ));
}

#[tokio::test]
async fn setup_without_ack_times_out() {
    let url = spawn_server(|mut socket| async move {
        let _setup = next_json(&mut socket).await;
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    })
    .await;
    let mut cfg = config(url);
    cfg.setup_timeout_secs = 1;

    let err = LiveSession::connect(&cfg, "x").await.expect_err("no ack");
    assert!(matches!(err, LiveError::SetupTimeout(1)), "got {err:?}");
}

#[tokio::test]
async fn server_closing_during_setup_is_an_error() {
    let url = spawn_server(|mut socket| async move {
        let _setup = next_json(&mut socket).await;
        socket.close(None).await.expect("close");
    })
    .await;

    let err = LiveSession::connect(&config(url), "x").await.expect_err("closed");
    assert!(matches!(err, LiveError::Closed), "got {err:?}");
}

#[tokio::test]
async fn go_away_during_setup_is_a_protocol_error() {
    let url = spawn_server(|mut socket| async move {
        let _setup = next_json(&mut socket).await;
        send_json(&mut socket, serde_json::json!({"goAway": {"timeLeft": "0s"}})).await;
        let _ = socket.next().await;
    })
    .await;

    let err = LiveSession::connect(&config(url), "x").await.expect_err("go away");
    assert!(matches!(err, LiveError::Protocol(_)), "got {err:?}");
}

struct NullCapture;

impl AudioCapture for NullCapture {
    fn stop(&mut self) {}
}

struct RecordingOutput(Arc<std::sync::Mutex<Vec<f64>>>);

impl AudioOutput for RecordingOutput {
    fn current_time(&self) -> f64 {
        0.0
    }

    fn play_at(&mut self, _chunk: &AudioChunk, at: f64) -> Result<(), LiveError> {
        self.0.lock().expect("lock").push(at);
        Ok(())
    }

    fn stop_all(&mut self) {}
}

#[tokio::test]
async fn voice_agent_runs_a_conversation_to_close() {
    let url = spawn_server(|mut socket| async move {
        let setup = next_json(&mut socket).await;
        let instruction = setup["setup"]["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        assert!(instruction.contains("Latitude: -23.55"));
        send_json(&mut socket, serde_json::json!({"setupComplete": {}})).await;

        let _first_frame = next_json(&mut socket).await;
        send_json(
            &mut socket,
            serde_json::json!({"serverContent": {"inputTranscription": {"text": "onde descarto pilhas?"}}}),
        )
        .await;
        send_json(
            &mut socket,
            serde_json::json!({"serverContent": {
                "outputTranscription": {"text": "No Ecoponto mais próximo."},
                "modelTurn": {"parts": [
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": speech(&[0; 2400])}},
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": speech(&[0; 2400])}}
                ]},
                "turnComplete": true
            }}),
        )
        .await;
        socket.close(None).await.expect("close");
    })
    .await;

    let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut agent = VoiceAgent::new(
        config(url),
        Arc::new(Roster::default()),
        LocationState::Available(UserLocation::new(-23.55, -46.63)),
    );
    let mut updates = agent.subscribe();
    agent
        .start(
            Box::new(RecordingOutput(Arc::clone(&starts))),
            Box::new(NullCapture),
        )
        .await
        .expect("starts");
    assert_eq!(agent.state(), ConnectionState::Connected);

    let (frames_tx, mut frames) = mpsc::channel(4);
    frames_tx.send(vec![0.0_f32; 4096]).await.expect("queue frame");
    let (_stop_tx, mut stop) = oneshot::channel();

    let state = agent.run(&mut frames, &mut stop).await.expect("runs");
    assert_eq!(state, ConnectionState::Closed);
    assert_eq!(
        agent.history(),
        &[TurnRecord {
            user: "onde descarto pilhas?".to_string(),
            agent: "No Ecoponto mais próximo.".to_string(),
        }]
    );

    let starts = starts.lock().expect("lock").clone();
    assert_eq!(starts.len(), 2);
    assert!(starts[0].abs() < f64::EPSILON);
    assert!((starts[1] - 0.1).abs() < 1e-9);

    let mut saw_connected = false;
    while let Ok(update) = updates.try_recv() {
        if update == gaia_live::AgentUpdate::State(ConnectionState::Connected) {
            saw_connected = true;
        }
    }
    assert!(saw_connected);
}

#[tokio::test]
async fn stop_signal_ends_the_session() {
    let url = spawn_server(|mut socket| async move {
        let _setup = next_json(&mut socket).await;
        send_json(&mut socket, serde_json::json!({"setupComplete": {}})).await;
        while let Some(Ok(msg)) = socket.next().await {
            if msg.is_close() {
                break;
            }
        }
    })
    .await;

    let mut agent = VoiceAgent::new(config(url), Arc::new(Roster::default()), LocationState::Unknown);
    agent
        .start(
            Box::new(RecordingOutput(Arc::default())),
            Box::new(NullCapture),
        )
        .await
        .expect("starts");

    let (_frames_tx, mut frames) = mpsc::channel::<Vec<f32>>(1);
    let (stop_tx, mut stop) = oneshot::channel();
    stop_tx.send(()).expect("signal");

    let state = agent.run(&mut frames, &mut stop).await.expect("runs");
    assert_eq!(state, ConnectionState::Closed);
    agent.cleanup();
    assert_eq!(agent.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn each_session_starts_with_empty_history() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("ws://{}/live", listener.local_addr().expect("addr"));
    tokio::spawn(async move {
        for said in ["primeira", "segunda"] {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut socket = accept_async(stream).await.expect("handshake");
            let _setup = next_json(&mut socket).await;
            send_json(&mut socket, serde_json::json!({"setupComplete": {}})).await;
            send_json(
                &mut socket,
                serde_json::json!({"serverContent": {
                    "inputTranscription": {"text": said},
                    "outputTranscription": {"text": "ok"},
                    "turnComplete": true
                }}),
            )
            .await;
            socket.close(None).await.expect("close");
        }
    });

    let mut agent = VoiceAgent::new(config(url), Arc::new(Roster::default()), LocationState::Unknown);
    for _ in 0..2 {
        agent
            .start(
                Box::new(RecordingOutput(Arc::default())),
                Box::new(NullCapture),
            )
            .await
            .expect("starts");
        let (_frames_tx, mut frames) = mpsc::channel::<Vec<f32>>(1);
        let (_stop_tx, mut stop) = oneshot::channel();
        let state = agent.run(&mut frames, &mut stop).await.expect("runs");
        assert_eq!(state, ConnectionState::Closed);
    }

    assert_eq!(
        agent.history(),
        &[TurnRecord {
            user: "segunda".to_string(),
            agent: "ok".to_string(),
        }]
    );
}
