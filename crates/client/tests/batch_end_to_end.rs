//! Batches against a real conversion server on a loopback port

use image::{DynamicImage, ImageFormat, RgbaImage};
use imgconv_client::{
    BatchOrchestrator, ClientConfig, ConvertClient, DirectorySink, HandleStore, MemoryStore,
    RecordingSink, SelectedFile, TempFileStore,
};
use imgconv_server::{AppState, ServerConfig, router};
use std::io::Cursor;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let state = AppState::from_config(&ServerConfig::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> ConvertClient {
    ConvertClient::with_config(ClientConfig::default().with_base_url(base_url)).unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| image::Rgba([(x * 7) as u8, (y * 5) as u8, 90, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_automatic_batch_writes_files() {
    let base_url = spawn_server().await;
    let out = tempfile::TempDir::new().unwrap();
    let store = Arc::new(TempFileStore::new());
    let orchestrator = BatchOrchestrator::new(client(&base_url), store.clone(), DirectorySink::new(out.path()));

    let files = vec![
        SelectedFile::from_bytes(Some("one.png".to_string()), png(8, 8)),
        SelectedFile::from_bytes(Some("two.png".to_string()), png(4, 12)),
    ];
    let outcome = orchestrator.convert_batch(&files, "jpeg", false).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(store.live(), 0);
    for name in ["converted_one.png.jpeg", "converted_two.png.jpeg"] {
        let bytes = std::fs::read(out.path().join(name)).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }
}

#[tokio::test]
async fn test_manual_batch_stops_at_malformed_file() {
    let base_url = spawn_server().await;
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let orchestrator = BatchOrchestrator::new(client(&base_url), store.clone(), sink.clone());

    let files = vec![
        SelectedFile::from_bytes(Some("good.png".to_string()), png(6, 6)),
        SelectedFile::from_bytes(Some("broken.png".to_string()), b"definitely not an image".to_vec()),
        SelectedFile::from_bytes(Some("never.png".to_string()), png(6, 6)),
    ];
    let outcome = orchestrator.convert_batch(&files, "webp", true).await.unwrap();

    assert_eq!(outcome.attempted, 2);
    assert_eq!(
        orchestrator.state().last_error.as_deref(),
        Some("Failed to convert image")
    );

    let pending = orchestrator.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].download_name, "converted_good.png.webp");

    assert!(orchestrator.download_pending(pending[0].id).unwrap());
    let (name, bytes) = sink.deliveries().remove(0);
    assert_eq!(name, "converted_good.png.webp");
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);
    assert_eq!(store.live(), 0);
}

#[tokio::test]
async fn test_unsupported_format_message_reaches_state() {
    let base_url = spawn_server().await;
    let orchestrator = BatchOrchestrator::new(client(&base_url), MemoryStore::new(), RecordingSink::new());

    let files = vec![SelectedFile::from_bytes(Some("a.png".to_string()), png(2, 2))];
    let outcome = orchestrator.convert_batch(&files, "bmp", false).await.unwrap();

    assert_eq!(outcome.failure.unwrap().message, "Unsupported format");
    assert_eq!(orchestrator.state().last_error.as_deref(), Some("Unsupported format"));
}

#[tokio::test]
async fn test_health_round_trip() {
    let base_url = spawn_server().await;
    let health = client(&base_url).health().await.unwrap();
    assert_eq!(health.status, "ok");
}
