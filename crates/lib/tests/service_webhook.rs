//! Integration test: run the service in webhook mode against a fake Bot API
//! server, POST updates to the webhook, and assert replies and stored files.
//! Does not require a real bot token. Server tasks are left running when the
//! tests end.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use lib::config::{Config, Replies};
use lib::service;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "testtoken";
const PHOTO_BYTES: &[u8] = b"jpeg-bytes";

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("snapvault-{}-{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Records sendMessage bodies posted by the bot.
#[derive(Clone, Default)]
struct FakeApi {
    sent: Arc<Mutex<Vec<Value>>>,
}

async fn get_file() -> Json<Value> {
    Json(json!({
        "ok": true,
        "result": {
            "file_id": "R",
            "file_path": "photos/photo123.jpg",
            "file_size": PHOTO_BYTES.len()
        }
    }))
}

async fn send_message(State(api): State<FakeApi>, Json(body): Json<Value>) -> Json<Value> {
    api.sent.lock().unwrap().push(body);
    Json(json!({ "ok": true, "result": {} }))
}

async fn ok_true() -> Json<Value> {
    Json(json!({ "ok": true, "result": true }))
}

async fn file_bytes() -> &'static [u8] {
    PHOTO_BYTES
}

/// Start the fake Bot API on a free port; returns its base URL and the recorder.
async fn start_fake_api() -> (String, FakeApi) {
    let api = FakeApi::default();
    let app = Router::new()
        .route(&format!("/bot{}/getFile", TOKEN), get(get_file))
        .route(&format!("/bot{}/sendMessage", TOKEN), post(send_message))
        .route(&format!("/bot{}/setWebhook", TOKEN), post(ok_true))
        .route(&format!("/bot{}/deleteWebhook", TOKEN), post(ok_true))
        .route(
            &format!("/file/bot{}/photos/photo123.jpg", TOKEN),
            get(file_bytes),
        )
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake api");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake api serve");
    });
    (format!("http://{}", addr), api)
}

fn service_config(api_base: &str, port: u16, storage: &Path, secret: Option<&str>) -> Config {
    let mut config = Config::default();
    config.server.port = port;
    config.server.bind = "127.0.0.1".to_string();
    config.channels.telegram.bot_token = Some(TOKEN.to_string());
    config.channels.telegram.api_base = Some(api_base.to_string());
    config.channels.telegram.webhook_url =
        Some(format!("http://127.0.0.1:{}/telegram/webhook", port));
    config.channels.telegram.webhook_secret = secret.map(String::from);
    config.media.storage_dir = Some(storage.to_path_buf());
    config
}

/// POST an update to the bot's webhook, retrying until the listener is up.
async fn post_update(client: &reqwest::Client, url: &str, secret: Option<&str>, update: &Value) {
    for _ in 0..100 {
        let mut req = client.post(url).json(update);
        if let Some(s) = secret {
            req = req.header("X-Telegram-Bot-Api-Secret-Token", s);
        }
        if let Ok(resp) = req.send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("webhook POST to {} did not succeed within 5s", url);
}

fn recorded(api: &FakeApi) -> Vec<(Option<i64>, Option<String>)> {
    api.sent
        .lock()
        .unwrap()
        .iter()
        .map(|b| {
            (
                b.get("chat_id").and_then(Value::as_i64),
                b.get("text").and_then(Value::as_str).map(String::from),
            )
        })
        .collect()
}

#[tokio::test]
async fn webhook_photo_is_stored_and_acknowledged() {
    let (api_base, api) = start_fake_api().await;
    let port = free_port();
    let dir = temp_dir("webhook-photo");
    let storage = dir.join("photos");
    let config = service_config(&api_base, port, &storage, None);
    let config_path = dir.join("config.json");
    tokio::spawn(async move {
        let _ = service::run_service(config, config_path).await;
    });

    let update = json!({
        "update_id": 1,
        "message": {
            "chat": { "id": 42 },
            "photo": [
                { "file_id": "small", "file_size": 1 },
                { "file_id": "R", "file_size": PHOTO_BYTES.len() }
            ]
        }
    });
    let client = reqwest::Client::new();
    let webhook_url = format!("http://127.0.0.1:{}/telegram/webhook", port);
    post_update(&client, &webhook_url, None, &update).await;

    let stored = storage.join("photo123.jpg");
    for _ in 0..100 {
        let sent = recorded(&api);
        if !sent.is_empty() {
            assert_eq!(
                sent,
                vec![(Some(42), Some(Replies::default().photo_saved))]
            );
            assert_eq!(std::fs::read(&stored).expect("read stored photo"), PHOTO_BYTES);
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no sendMessage recorded within 5s");
}

#[tokio::test]
async fn webhook_command_replies_welcome_and_health_responds() {
    let (api_base, api) = start_fake_api().await;
    let port = free_port();
    let dir = temp_dir("webhook-command");
    let storage = dir.join("photos");
    let config = service_config(&api_base, port, &storage, Some("s3cret"));
    let config_path = dir.join("config.json");
    tokio::spawn(async move {
        let _ = service::run_service(config, config_path).await;
    });

    let update = json!({
        "update_id": 2,
        "message": { "chat": { "id": 7 }, "text": "/start" }
    });
    let client = reqwest::Client::new();
    let webhook_url = format!("http://127.0.0.1:{}/telegram/webhook", port);
    post_update(&client, &webhook_url, Some("s3cret"), &update).await;

    // Wrong secret is rejected.
    let resp = client
        .post(&webhook_url)
        .json(&update)
        .send()
        .await
        .expect("post without secret");
    assert_eq!(resp.status().as_u16(), 403);

    // Health endpoint answers on the same port.
    let health: Value = client
        .get(format!("http://127.0.0.1:{}/", port))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("health json");
    assert_eq!(health.get("runtime").and_then(Value::as_str), Some("running"));
    assert_eq!(health.get("port").and_then(Value::as_u64), Some(port as u64));

    for _ in 0..100 {
        let sent = recorded(&api);
        if !sent.is_empty() {
            assert_eq!(sent, vec![(Some(7), Some(Replies::default().welcome))]);
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no sendMessage recorded within 5s");
}
