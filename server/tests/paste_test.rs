//! Integration tests for submitting and following pastes:
//! URL shortening, file upload, deduplication, and resolution.

use linkpaste_server::config::Config;
use linkpaste_server::digest::digest_str;
use linkpaste_server::keys::SqliteRegistry;
use linkpaste_server::state::AppState;
use reqwest::multipart::{Form, Part};
use tokio::net::TcpListener;

const PUBLIC_URL: &str = "http://paste.test";

/// Helper: start the server on a random port and return the base URL with
/// its state.
async fn start_test_server(max_file_bytes: u64) -> (String, AppState) {
    // Create a temporary data directory
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let config = Config {
        url: format!("{}/", PUBLIC_URL),
        max_file_bytes,
        ..Config::with_data_dir(tmp_dir.path())
    };
    let state = AppState::from_config(&config).expect("Failed to build state");

    let app = linkpaste_server::routes::build_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        // Keep tmp_dir alive so the data directory isn't deleted
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), state)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// POST a form and return the key from the returned link.
async fn submit(base_url: &str, form: Form) -> String {
    let resp = client().post(base_url).multipart(form).send().await.unwrap();
    assert_eq!(resp.status(), 200, "Submission failed");
    let link = resp.text().await.unwrap();
    link.strip_prefix(&format!("{}/", PUBLIC_URL))
        .unwrap_or_else(|| panic!("unexpected link {}", link))
        .to_string()
}

async fn submit_url(base_url: &str, url: &str) -> String {
    submit(base_url, Form::new().text("url", url.to_string())).await
}

async fn submit_file(base_url: &str, bytes: &[u8]) -> String {
    let part = Part::bytes(bytes.to_vec()).file_name("paste.txt");
    submit(base_url, Form::new().part("file", part)).await
}

fn entry_count(state: &AppState) -> i64 {
    SqliteRegistry::new(state.db.clone()).count_entries().unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_url_gets_shortest_prefix_and_dedups() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let url = "http://example.com/a";
    let digest = digest_str(url);

    let key = submit_url(&base_url, url).await;
    assert_eq!(key, &digest[..1]);

    let again = submit_url(&base_url, url).await;
    assert_eq!(again, key);
    assert_eq!(entry_count(&state), 1);

    // A different URL whose digest starts with the same character
    let other = (0..)
        .map(|i| format!("http://example.com/other/{}", i))
        .find(|u| digest_str(u).starts_with(&key))
        .unwrap();
    let other_key = submit_url(&base_url, &other).await;
    assert!(other_key.len() >= 2, "expected a longer key, got {}", other_key);
    assert!(digest_str(&other).starts_with(&other_key));
    assert_eq!(entry_count(&state), 2);
}

#[tokio::test]
async fn test_url_key_redirects() {
    let (base_url, _state) = start_test_server(1024 * 1024).await;
    let url = "https://www.rust-lang.org/learn?x=1";
    let key = submit_url(&base_url, url).await;

    let resp = client()
        .get(format!("{}/{}", base_url, key))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 307);
    assert_eq!(resp.headers()["location"], url);
}

#[tokio::test]
async fn test_file_round_trip() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let bytes = b"fn main() {\n    println!(\"hi\");\n}\n";

    let key = submit_file(&base_url, bytes).await;
    let digest = digest_str(std::str::from_utf8(bytes).unwrap());
    assert!(digest.starts_with(&key));

    // Blob is stored under the full digest
    assert!(state.paste.blobs().has_blob(&digest));

    let resp = client()
        .get(format!("{}/{}", base_url, key))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), bytes);
}

#[tokio::test]
async fn test_identical_files_share_key() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

    let first = submit_file(&base_url, &data).await;
    let second = submit_file(&base_url, &data).await;
    assert_eq!(first, second);
    assert_eq!(entry_count(&state), 1);

    let blobs: Vec<_> = std::fs::read_dir(state.paste.blobs().dir())
        .unwrap()
        .collect();
    assert_eq!(blobs.len(), 1);

    let resp = client()
        .get(format!("{}/{}", base_url, first))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), data.as_slice());
}

#[tokio::test]
async fn test_url_wins_over_file() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let form = Form::new()
        .text("url", "http://example.com/both")
        .part("file", Part::bytes(b"ignored".to_vec()).file_name("x"));
    let key = submit(&base_url, form).await;

    let entry = state.paste.resolve(&key).unwrap();
    assert_eq!(entry.value, "http://example.com/both");
    assert!(!state.paste.blobs().has_blob(&digest_str("ignored")));
}

#[tokio::test]
async fn test_unknown_key_is_404() {
    let (base_url, _state) = start_test_server(1024 * 1024).await;
    let resp = client()
        .get(format!("{}/doesnotexist", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_empty_form_is_400() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let resp = client()
        .post(&base_url)
        .multipart(Form::new().text("url", ""))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Not a multipart body at all
    let resp = client()
        .post(&base_url)
        .body("url=http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(entry_count(&state), 0);
}

#[tokio::test]
async fn test_url_with_control_chars_is_400() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let resp = client()
        .post(&base_url)
        .multipart(Form::new().text("url", "http://a.example/x\ny"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(entry_count(&state), 0);

    // The key it would have taken is still free
    let resp = client()
        .get(format!("{}/{}", base_url, &digest_str("http://a.example/x\ny")[..1]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_oversized_file_is_413() {
    let (base_url, state) = start_test_server(1024).await;
    let part = Part::bytes(vec![b'x'; 4096]).file_name("big.txt");
    let resp = client()
        .post(&base_url)
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    assert_eq!(entry_count(&state), 0);

    // Exactly at the limit is fine
    let key = submit_file(&base_url, &[b'y'; 1024]).await;
    assert!(!key.is_empty());
}

#[tokio::test]
async fn test_concurrent_same_url_single_entry() {
    let (base_url, state) = start_test_server(1024 * 1024).await;
    let url = "http://example.com/popular";

    let mut handles = Vec::new();
    for _ in 0..16 {
        let base_url = base_url.clone();
        handles.push(tokio::spawn(async move { submit_url(&base_url, url).await }));
    }

    let mut keys = Vec::new();
    for handle in handles {
        keys.push(handle.await.unwrap());
    }
    keys.dedup();
    assert_eq!(keys.len(), 1, "expected one key, got {:?}", keys);
    assert_eq!(entry_count(&state), 1);
}

#[tokio::test]
async fn test_index_robots_and_health() {
    let (base_url, _state) = start_test_server(8 * 1024 * 1024).await;
    let c = client();

    let index = c.get(&base_url).send().await.unwrap().text().await.unwrap();
    assert!(index.contains(PUBLIC_URL));
    assert!(index.contains("8 MiB"));

    let robots = c
        .get(format!("{}/robots.txt", base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(robots, "User-agent: *\nDisallow: /\n");

    let health = c
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(health, "ok");
}
