//! Listening sessions against a local WebSocket server

use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use vibeflow_core::capture::{CaptureTaps, PlaybackInput};
use vibeflow_core::session::{Connector, WsConnector};
use vibeflow_core::{MatchClient, SessionOutcome, SessionUpdate, VibeflowError};

const CONFIRMED: &str = r#"{
    "type": "confirmed",
    "message": "Match confirmed",
    "data": {
        "song_id": 9,
        "title": "Night Drive",
        "artist": "The Examples",
        "matched_hashes": 31,
        "min_required": 25,
        "query_hashes": 640,
        "confidence": 74.2,
        "is_confirmed": true,
        "candidates": []
    }
}"#;

fn tone_input(frames: usize) -> Box<PlaybackInput> {
    let samples: Vec<f32> = (0..frames * 400)
        .map(|i| ((i % 40) as f32 / 40.0) - 0.5)
        .collect();
    Box::new(
        PlaybackInput::new(samples, 8000, 1)
            .with_chunk_frames(400)
            .realtime(false),
    )
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{}/ws/shazam/", addr))
}

#[tokio::test]
async fn test_confirmed_over_websocket() {
    let (listener, url) = bind().await;
    let auth = Arc::new(Mutex::new(None::<String>));

    let seen_auth = auth.clone();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            *seen_auth.lock().unwrap() = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();

        let mut chunks = Vec::new();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Binary(data) = msg {
                chunks.push(data);
                if chunks.len() == 3 {
                    ws.send(Message::Text(CONFIRMED.to_string())).await.unwrap();
                }
            }
        }
        chunks
    });

    let connector = Arc::new(WsConnector::new(Some("secret".to_string())));
    let mut client = MatchClient::new(connector, url, 400);
    let mut handle = client
        .start(tone_input(50), CaptureTaps::default())
        .unwrap();

    let mut updates = Vec::new();
    while let Some(update) = handle.next_update().await {
        let done = matches!(update, SessionUpdate::Confirmed(_));
        updates.push(update);
        if done {
            break;
        }
    }
    let report = handle.wait().await;

    match &report.outcome {
        SessionOutcome::Confirmed(candidate) => {
            assert_eq!(candidate.title, "Night Drive");
            assert_eq!(candidate.song_id, Some(9));
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
    assert!(report.frames_sent >= 3);
    assert_eq!(updates.first(), Some(&SessionUpdate::Connecting));
    assert!(updates.contains(&SessionUpdate::Connected));

    let chunks = server.await.unwrap();
    assert!(chunks.len() as u64 >= 3);
    for chunk in &chunks {
        assert_eq!(&chunk[..4], b"RIFF");
        assert_eq!(chunk.len(), 44 + 400 * 2);
    }
    assert_eq!(auth.lock().unwrap().as_deref(), Some("Bearer secret"));
}

#[tokio::test]
async fn test_server_hangs_up() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
    });

    let mut client = MatchClient::new(Arc::new(WsConnector::new(None)), url, 400);
    let handle = client
        .start(tone_input(500), CaptureTaps::default())
        .unwrap();
    let report = handle.wait().await;

    assert!(matches!(
        report.outcome,
        SessionOutcome::Failed(VibeflowError::Connection(_))
    ));
    assert!(!client.is_live());
}

#[tokio::test]
async fn test_nothing_listening() {
    let (listener, url) = bind().await;
    drop(listener);

    let mut client = MatchClient::new(Arc::new(WsConnector::new(None)), url, 400);
    let report = client
        .start(tone_input(1), CaptureTaps::default())
        .unwrap()
        .wait()
        .await;

    assert!(matches!(
        report.outcome,
        SessionOutcome::Failed(VibeflowError::Connection(_))
    ));
    assert_eq!(report.frames_sent, 0);
}

#[tokio::test]
async fn test_secure_url_starts_tls_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("wss://{}/ws/shazam/", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut first = [0u8; 1];
        stream.read_exact(&mut first).await.unwrap();
        // Hang up without answering the handshake
        first[0]
    });

    let (events, _rx) = tokio::sync::mpsc::unbounded_channel();
    let result = WsConnector::new(None).connect(&url, events).await;

    // 0x16 opens a TLS handshake record
    assert_eq!(server.await.unwrap(), 0x16);
    match result {
        Err(VibeflowError::Connection(message)) => {
            assert!(!message.contains("not compiled"), "{}", message);
        }
        Err(other) => panic!("expected a connection error, got {:?}", other),
        Ok(_) => panic!("handshake against a closed socket succeeded"),
    }
}
