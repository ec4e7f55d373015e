#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tiny_http::{Header, Response, Server, StatusCode};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout.trim()).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}); see {}\n{}",
                self.log_path.display(),
                self.stdout
            )
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_rdash") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "rdash.exe" } else { "rdash" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve rdash binary path for integration test"),
    }
}

/// Run the binary with `HOME` pointed at `home` so no real user config leaks in.
pub fn run_cli_case(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, home, args, &[])
}

pub fn run_cli_case_with_env(
    case_name: &str,
    home: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> CmdResult {
    let root = std::env::temp_dir().join("rdash-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("HOME", home)
        .env("RUST_BACKTRACE", "1")
        .env_remove("RDASH_OUTPUT_FORMAT")
        .env_remove("RDASH_FEED_SOURCE")
        .env_remove("RDASH_FEED_POLL_INTERVAL_MS");
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command.output().expect("execute rdash command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Local feed endpoint replaying `(status, body)` pairs in order; the last
/// pair repeats once the script runs out.
pub struct ScriptedFeed {
    pub url: String,
    pub requests: Arc<AtomicUsize>,
}

pub fn serve_script(script: Vec<(u16, &str)>) -> ScriptedFeed {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let url = format!("http://{}/parameters.json", server.server_addr());
    let script: VecDeque<(u16, String)> = script
        .into_iter()
        .map(|(status, body)| (status, body.to_string()))
        .collect();
    let script = Arc::new(Mutex::new(script));
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);

    thread::spawn(move || {
        for req in server.incoming_requests() {
            let (status, body) = {
                let mut script = script.lock();
                if script.len() > 1 {
                    script.pop_front().expect("non-empty script")
                } else {
                    script.front().cloned().unwrap_or((404, String::new()))
                }
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let header =
                Header::from_bytes("Content-Type", "application/json").expect("content-type header");
            let _ = req.respond(
                Response::from_string(body)
                    .with_status_code(StatusCode(status))
                    .with_header(header),
            );
        }
    });

    ScriptedFeed { url, requests }
}

/// Write a minimal config pointing at `source` and return its path.
pub fn write_config(dir: &Path, source: &str, extra: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let body = format!(
        "[feed]\nsource = \"{source}\"\npoll_interval_ms = 20\n\n[logging]\nenabled = false\n{extra}"
    );
    fs::write(&path, body).expect("write config");
    path
}
