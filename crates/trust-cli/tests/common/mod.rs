//! Shared E2E test helpers for `trust` binary tests.

#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

/// Variables that would leak the developer's configuration into a test.
/// Proxy variables are removed so requests reach the local mock server.
const ISOLATED_VARS: &[&str] = &[
    "TRUST_DEBUG",
    "TRUST_BACKEND_URL",
    "BACKEND_BASE_URL",
    "TRUST_BACKEND_TIMEOUT_MS",
    "TRUST_STORAGE_PATH",
    "TRUST_IDENTITY_FALLBACK",
    "TRUST_ROLELESS",
    "TRUST_PASSWORD",
    "RUST_LOG",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
];

/// Build a Command for the `trust` binary rooted at `home`.
///
/// `home` serves as `$HOME`, the project root and the storage directory,
/// so several invocations on the same `home` share a session.
pub fn trust_cmd_at(home: &Path) -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("trust");
    cmd.timeout(TIMEOUT_BASIC);
    for var in ISOLATED_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home).current_dir(home);
    cmd.arg("--storage").arg(home.join("storage.json"));
    cmd
}

/// Build a Command for the `trust` binary with a fresh home directory.
///
/// Returns (command, _guard). Keep the guard alive for the test's duration.
pub fn trust_cmd() -> (assert_cmd::Command, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("create temp dir for home");
    let cmd = trust_cmd_at(tmp.path());
    (cmd, tmp)
}

/// Writes a directory listing to `<home>/users.json` and returns its path.
pub fn write_users(home: &Path, users: &str) -> std::path::PathBuf {
    let path = home.join("users.json");
    std::fs::write(&path, users).expect("write users file");
    path
}

/// Writes a storage file holding a session for `email`.
pub fn store_session(home: &Path, email: &str) {
    let record = serde_json::json!({ "email": email }).to_string();
    let storage = serde_json::json!({ "trust.currentUser": record });
    std::fs::write(home.join("storage.json"), storage.to_string()).expect("write storage");
}

/// Directory listing used across tests.
pub const USERS: &str = r#"{"results":[
    {"id":1,"full_name":"Ana Ruiz","email":"ana@example.com","role":"inspector","role_label":"Inspector","is_active":true},
    {"id":2,"full_name":"Bruno Díaz","email":"bruno@example.com","role":"branch_admin","role_label":"Administrador de sucursal","is_active":true},
    {"id":3,"full_name":"Carla Gómez","email":"carla@example.com","role":"general_admin","role_label":"Administrador general","is_active":true}
]}"#;

/// Starts a mock HTTP backend answering `routes` as (path, status, body).
///
/// Unknown paths answer 404. Returns the base URL. The server thread runs
/// until the test process exits.
pub fn spawn_backend(routes: Vec<(&'static str, u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock HTTP server");
    let port = listener.local_addr().expect("get mock port").port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                break;
            };
            let Some(path) = read_request_path(&mut stream) else {
                continue;
            };
            let (status, body) = routes
                .iter()
                .find(|(route, _, _)| *route == path)
                .map(|(_, status, body)| (*status, body.clone()))
                .unwrap_or((404, r#"{"detail":"not found"}"#.to_string()));

            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len(),
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    format!("http://127.0.0.1:{port}")
}

/// Reads one request (headers plus `Content-Length` body) and returns its path.
fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let target = head.lines().next()?.split_whitespace().nth(1)?;
    Some(target.split('?').next().unwrap_or(target).to_string())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
