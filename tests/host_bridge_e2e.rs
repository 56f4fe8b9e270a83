//! End-to-end tests for the `cityscope-host` binary (stdin/stdout JSON bridge).
//!
//! Each test spawns a fresh subprocess configured through `CITYSCOPE_CONFIG`
//! to talk to a `wiremock` Openverse endpoint, sends commands over stdin and
//! reads state lines from stdout.

use std::process::Stdio;
use std::time::Duration;

use cityscope::{Provider, SearchConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OPENVERSE_FIXTURE: &str = include_str!("../test-data/openverse.json");

struct HostBridgeHarness {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    reader: Lines<BufReader<ChildStdout>>,
    _dir: tempfile::TempDir,
}

impl HostBridgeHarness {
    async fn spawn(openverse_uri: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.toml");
        let mut config = SearchConfig {
            providers: vec![Provider::Openverse],
            cache_ttl_seconds: 0,
            timeout_seconds: 5,
            ..Default::default()
        };
        config.endpoints.openverse = openverse_uri.to_string();
        config.save_to_file(&config_path).expect("write config");

        let mut child = Command::new(env!("CARGO_BIN_EXE_cityscope-host"))
            .env("CITYSCOPE_CONFIG", &config_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn cityscope-host");

        let stdin = child.stdin.take().expect("no stdin on child process");
        let stdout = child.stdout.take().expect("no stdout on child process");

        Self {
            child,
            stdin: BufWriter::new(stdin),
            reader: BufReader::new(stdout).lines(),
            _dir: dir,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.stdin.write_all(line.as_bytes()).await.expect("write");
        self.stdin.write_all(b"\n").await.expect("write");
        self.stdin.flush().await.expect("flush");
    }

    async fn send(&mut self, command: Value) {
        self.send_raw(&command.to_string()).await;
    }

    async fn read_line(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.reader.next_line())
            .await
            .expect("timeout reading from cityscope-host")
            .expect("IO error reading from cityscope-host")
            .expect("unexpected EOF from cityscope-host");
        serde_json::from_str(&line)
            .unwrap_or_else(|e| panic!("invalid JSON from cityscope-host: {e}\nraw line: {line}"))
    }

    /// Read lines until a settled state arrives.
    async fn read_settled(&mut self) -> Value {
        loop {
            let value = self.read_line().await;
            if value["state"] == "settled" {
                return value;
            }
        }
    }

    async fn stop(mut self) {
        self.send(json!({"command": "stop"})).await;
        let status = tokio::time::timeout(Duration::from_secs(10), self.child.wait())
            .await
            .expect("timeout waiting for exit")
            .expect("wait failed");
        assert!(status.success(), "cityscope-host exited with {status}");
    }
}

async fn openverse_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/images/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(OPENVERSE_FIXTURE.to_owned(), "application/json"),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn query_produces_settled_state() {
    let server = openverse_server().await;
    let mut host = HostBridgeHarness::spawn(&server.uri()).await;

    host.send(json!({"command": "query", "text": "Paris, eiffel tower"}))
        .await;
    let settled = host.read_settled().await;

    assert_eq!(settled["generation"], 1);
    assert!(settled["error"].is_null());
    let results = settled["results"].as_array().expect("results array");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["title"], "Tour Eiffel, Paris");
    assert_eq!(results[0]["source"], "openverse");

    host.stop().await;
}

#[tokio::test]
async fn settings_limit_is_applied() {
    let server = openverse_server().await;
    let mut host = HostBridgeHarness::spawn(&server.uri()).await;

    host.send(json!({"command": "query", "text": "Paris"})).await;
    host.read_settled().await;

    host.send(json!({"command": "settings", "providers": ["openverse"], "limit": 1}))
        .await;
    let settled = host.read_settled().await;
    assert_eq!(settled["generation"], 2);
    assert_eq!(settled["results"].as_array().expect("results").len(), 1);

    host.stop().await;
}

#[tokio::test]
async fn malformed_command_gets_error_line() {
    let server = openverse_server().await;
    let mut host = HostBridgeHarness::spawn(&server.uri()).await;

    host.send_raw("{\"command\":\"launch\"}").await;
    let reply = host.read_line().await;
    assert!(reply["error"].as_str().expect("error field").contains("invalid command"));

    host.send(json!({"command": "query", "text": "   "})).await;
    assert_eq!(host.read_line().await, json!({"state": "idle"}));

    host.stop().await;
}
