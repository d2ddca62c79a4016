use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::{mpsc, Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock-image";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    cwd: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let cwd = base.join("work");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&cwd).expect("failed to create working directory");

        Self {
            _temp_dir: temp_dir,
            home,
            cwd,
        }
    }

    fn falcon_dir(&self) -> PathBuf {
        self.home.join(".falcon")
    }

    fn write_config(&self, config: Value) {
        fs::create_dir_all(self.falcon_dir()).expect("failed to create ~/.falcon");
        fs::write(
            self.falcon_dir().join("config.json"),
            serde_json::to_string_pretty(&config).unwrap(),
        )
        .expect("failed to write config");
    }

    fn history(&self) -> Value {
        let text = fs::read_to_string(self.falcon_dir().join("history.json"))
            .expect("history.json should exist");
        serde_json::from_str(&text).expect("history.json should be valid JSON")
    }
}

fn falcon(env: &CliTestEnv, args: &[&str], api_key: Option<&str>, api_url: Option<&str>) -> Output {
    let mut command = Command::new(PathBuf::from(assert_cmd::cargo::cargo_bin!("falcon")));
    command
        .args(args)
        .current_dir(&env.cwd)
        .env("HOME", &env.home)
        .env_remove("FAL_KEY")
        .env_remove("RUST_LOG")
        // Unroutable unless a mock is given, so a stray request fails fast
        .env("FALCON_API_URL", api_url.unwrap_or("http://127.0.0.1:9"));
    if let Some(key) = api_key {
        command.env("FAL_KEY", key);
    }
    command
        .output()
        .unwrap_or_else(|e| panic!("failed to execute falcon: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }
    panic!(
        "falcon {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================
// Mock fal.ai host
// ============================================

#[derive(Clone)]
struct MockState {
    base_url: String,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

/// Serves the run API on its own thread so the blocking CLI call can reach it.
struct MockFal {
    base_url: String,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockFal {
    fn start() -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();
        let server_calls = calls.clone();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build mock runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                let base_url = format!("http://{}", listener.local_addr().unwrap());
                tx.send(base_url.clone()).unwrap();

                let state = MockState {
                    base_url,
                    calls: server_calls,
                };
                let app = Router::new().fallback(handle).with_state(state);
                axum::serve(listener, app).await.unwrap();
            });
        });

        let base_url = rx.recv().expect("mock server failed to start");
        Self { base_url, calls }
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn handle(State(state): State<MockState>, method: Method, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().trim_start_matches('/').to_string();
    if method == Method::GET {
        return (StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], IMAGE_BYTES.to_vec())
            .into_response();
    }

    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.calls.lock().unwrap().push((path, body));
    Json(json!({
        "images": [{
            "url": format!("{}/files/1.png", state.base_url),
            "width": 1024,
            "height": 1024,
            "content_type": "image/png",
        }],
        "seed": 7,
    }))
    .into_response()
}

// ============================================
// Tests
// ============================================

#[test]
fn last_with_empty_history_needs_no_key() {
    let env = CliTestEnv::new();
    let output = falcon(&env, &["--last"], None, None);
    assert_success(&["--last"], &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("No previous generations found"));
}

#[test]
fn no_prompt_prints_help() {
    let env = CliTestEnv::new();
    let output = falcon(&env, &["--no-open"], None, None);
    assert_success(&["--no-open"], &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn upscale_with_empty_history_fails_without_network() {
    let env = CliTestEnv::new();
    let mock = MockFal::start();

    let output = falcon(&env, &["--up"], Some("test-key"), Some(&mock.base_url));
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("Error: No previous generation to upscale"),
        "unexpected stderr:\n{}",
        stderr(&output)
    );
    assert!(mock.calls().is_empty());
}

#[test]
fn invalid_flag_values_exit_with_one() {
    let env = CliTestEnv::new();
    for args in [
        &["fox", "-a", "7:3"][..],
        &["fox", "-r", "8K"][..],
        &["--up", "--scale", "9"][..],
    ] {
        let output = falcon(&env, args, Some("test-key"), None);
        assert_eq!(
            output.status.code(),
            Some(1),
            "falcon {} should exit 1, stderr:\n{}",
            args.join(" "),
            stderr(&output)
        );
        assert!(stderr(&output).contains("error"), "no message for {}", args.join(" "));
    }
}

#[test]
fn help_flag_exits_zero() {
    let env = CliTestEnv::new();
    let output = falcon(&env, &["--help"], None, None);
    assert_success(&["--help"], &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Presets"));
}

#[test]
fn missing_key_is_reported() {
    let env = CliTestEnv::new();
    let output = falcon(&env, &["a red fox", "--no-open"], None, None);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("FAL_KEY not found"));
}

#[test]
fn output_outside_cwd_is_rejected() {
    let env = CliTestEnv::new();
    let mock = MockFal::start();
    let args = ["a red fox", "-o", "../../etc/passwd", "--no-open"];

    let output = falcon(&env, &args, Some("test-key"), Some(&mock.base_url));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Output path must be within current directory: ../../etc/passwd"));
    assert!(mock.calls().is_empty());
}

#[test]
fn unknown_model_lists_available_models() {
    let env = CliTestEnv::new();
    let output = falcon(&env, &["a red fox", "-m", "dalle"], Some("test-key"), None);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Available models: gpt, banana, gemini, gemini3"));
}

#[test]
fn generate_uses_configured_defaults_and_records_history() {
    let env = CliTestEnv::new();
    env.write_config(json!({ "defaultModel": "banana", "defaultAspect": "1:1" }));
    let mock = MockFal::start();
    let args = ["a red fox", "--no-open"];

    let output = falcon(&env, &args, Some("test-key"), Some(&mock.base_url));
    assert_success(&args, &output);

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    let (path, body) = &calls[0];
    assert_eq!(path, "fal-ai/nano-banana-pro");
    assert_eq!(body["prompt"], "a red fox");
    assert_eq!(body["aspect_ratio"], "1:1");
    assert_eq!(body["resolution"], "2K");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ Saved:"), "unexpected stdout:\n{stdout}");
    assert!(stdout.contains("(1024x1024,"));

    let history = env.history();
    let generations = history["generations"].as_array().unwrap();
    assert_eq!(generations.len(), 1);
    assert_eq!(generations[0]["prompt"], "a red fox");
    assert_eq!(generations[0]["model"], "banana");
    assert!(generations[0]["cost"].as_f64().unwrap() > 0.0);
    assert!(history["totalCost"]["allTime"].as_f64().unwrap() > 0.0);

    let saved = PathBuf::from(generations[0]["output"].as_str().unwrap());
    assert!(saved.starts_with(env.cwd.canonicalize().unwrap()) || saved.starts_with(&env.cwd));
    assert_eq!(fs::read(&saved).unwrap(), IMAGE_BYTES);

    // --last now reports it
    let last = falcon(&env, &["--last"], None, None);
    assert_success(&["--last"], &last);
    assert!(String::from_utf8_lossy(&last.stdout).contains("a red fox"));
}

#[test]
fn preset_overrides_aspect_flag() {
    let env = CliTestEnv::new();
    let mock = MockFal::start();
    let args = ["a book cover", "-a", "16:9", "--cover", "-o", "cover.png", "--no-open"];

    let output = falcon(&env, &args, Some("test-key"), Some(&mock.base_url));
    assert_success(&args, &output);

    let calls = mock.calls();
    assert_eq!(calls[0].1["aspect_ratio"], "2:3");
    assert_eq!(calls[0].1["resolution"], "2K");
    assert!(env.cwd.join("cover.png").exists());
}
