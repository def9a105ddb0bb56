#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! API handler tests over an in-memory state: recording sink, temp-dir
//! device store and real remotes.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use ir_control_bridge::api::{
    self, AppState, LearnRequest, SendRequest,
};
use ir_control_bridge::config::RemoteConfig;
use ir_control_bridge::controllers::{Command, ControllerRegistry};
use ir_control_bridge::devices::DeviceStore;
use ir_control_bridge::remote::Remote;
use ir_control_bridge::sink::DispatchSink;
use ir_control_bridge::updates::UpdateChecker;

use support::{LearnScriptSink, RecordingSink};

const BROADLINK_DEVICE: &str = r#"{
    "manufacturer": "Acme",
    "supportedModels": ["TV-1"],
    "supportedController": "Broadlink",
    "commandsEncoding": "Base64",
    "commands": {"power": "JgBGAA==", "mute": "JgBGAQ=="}
}"#;

const ZHA_DEVICE: &str = r#"{
    "manufacturer": "Acme",
    "supportedModels": ["Blaster"],
    "supportedController": "ZHA",
    "commandsEncoding": "Raw",
    "commands": {"power": "CODE-P"}
}"#;

fn write_device_file(dir: &std::path::Path, code: u32, json: &str) {
    let codes_dir = dir.join("codes").join("remote");
    std::fs::create_dir_all(&codes_dir).unwrap();
    std::fs::write(codes_dir.join(format!("{code}.json")), json).unwrap();
}

async fn state_with_remote(
    dir: &tempfile::TempDir,
    device_json: &str,
    controller: &str,
    sink: Arc<dyn DispatchSink>,
) -> AppState {
    write_device_file(dir.path(), 1000, device_json);
    let store = Arc::new(DeviceStore::new(
        dir.path().to_path_buf(),
        "http://127.0.0.1:1/codes",
    ));

    let remote_config = RemoteConfig {
        name: "living".to_string(),
        device_code: 1000,
        controller: controller.to_string(),
        controller_data: "remote.rm4_pro".to_string(),
        delay_secs: 0.0,
    };
    let device = store.load("remote", 1000).await.unwrap();
    let remote =
        Remote::build(&remote_config, device, &ControllerRegistry::new(), sink).unwrap();

    let mut remotes = HashMap::new();
    remotes.insert("living".to_string(), Arc::new(remote));
    AppState::new(remotes, store, Arc::new(UpdateChecker::new("master")))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn send_named_command_dispatches_and_returns_ok() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink.clone()).await;

    let response = api::send_handler(
        State(state),
        Path("living".to_string()),
        Json(SendRequest {
            command: Command::from("power"),
            raw: false,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let issued = sink.issued();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].params["command"], json!(["b64:JgBGAA=="]));
}

#[tokio::test]
async fn unknown_remote_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink).await;

    let response = api::send_handler(
        State(state),
        Path("garage".to_string()),
        Json(SendRequest {
            command: Command::from("power"),
            raw: false,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_command_is_404_and_nothing_dispatches() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink.clone()).await;

    let response = api::send_handler(
        State(state),
        Path("living".to_string()),
        Json(SendRequest {
            command: Command::Sequence(vec!["power".into(), "volume_up".into()]),
            raw: false,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(sink.issued().is_empty());
}

#[tokio::test]
async fn raw_send_bypasses_the_command_table() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink.clone()).await;

    let response = api::send_handler(
        State(state),
        Path("living".to_string()),
        Json(SendRequest {
            command: Command::from("JgBGAQ=="),
            raw: true,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        sink.issued()[0].params["command"],
        json!(["b64:JgBGAQ=="])
    );
}

#[tokio::test]
async fn learn_on_a_backend_without_learn_support_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink).await;

    let response = api::learn_handler(
        State(state),
        Path("living".to_string()),
        Json(LearnRequest {
            command: "new_button".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn learn_stores_the_captured_code() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(LearnScriptSink::with_reads(vec![Some("A"), Some("B")]));
    let state = state_with_remote(&dir, ZHA_DEVICE, "ZHA", sink.clone()).await;

    let response = api::learn_handler(
        State(state.clone()),
        Path("living".to_string()),
        Json(LearnRequest {
            command: "new_button".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["command"], "new_button");
    assert_eq!(body["code"], "B");

    // The override layer now carries the learned command.
    let device = state.store.load("remote", 1000).await.unwrap();
    assert_eq!(device.commands["new_button"], Command::from("B"));
}

#[tokio::test(start_paused = true)]
async fn learn_timeout_reports_no_capture() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(LearnScriptSink::with_reads(vec![Some("A"); 40]));
    let state = state_with_remote(&dir, ZHA_DEVICE, "ZHA", sink.clone()).await;

    let response = api::learn_handler(
        State(state.clone()),
        Path("living".to_string()),
        Json(LearnRequest {
            command: "new_button".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // Nothing was stored for the failed capture.
    let device = state.store.load("remote", 1000).await.unwrap();
    assert!(!device.commands.contains_key("new_button"));
}

#[tokio::test]
async fn delete_removes_learned_command() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink).await;

    let response = api::delete_command_handler(
        State(state.clone()),
        Path(("living".to_string(), "mute".to_string())),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = api::delete_command_handler(
        State(state),
        Path(("living".to_string(), "mute".to_string())),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_reports_remotes_and_commands() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = state_with_remote(&dir, BROADLINK_DEVICE, "Broadlink", sink).await;

    let response = api::list_remotes_handler(State(state.clone())).await;
    let summaries = response.0;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].name, "living");
    assert_eq!(summaries[0].commands, vec!["mute", "power"]);

    let response = api::status_handler(State(state)).await;
    assert_eq!(response.0.remotes, 1);
    assert_eq!(response.0.service, "ir-control-bridge");
}
