//! Test fixtures: sample requests and scripted fake backends

use gateway_agents::AgentConfig;
use gateway_core::{ChatMessage, CompletionRequest};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Shell used to interpret fake backend scripts
pub const SHELL: &str = "/bin/sh";

/// Create a simple chat request for testing
pub fn simple_request(model: &str) -> CompletionRequest {
    CompletionRequest::builder()
        .model(model)
        .message(ChatMessage::user("Hello, how are you?"))
        .build()
        .expect("Failed to build request")
}

/// Create a chat request with a system prompt
pub fn request_with_system(model: &str, system: &str, user: &str) -> CompletionRequest {
    CompletionRequest::builder()
        .model(model)
        .system_prompt(system)
        .message(ChatMessage::user(user))
        .build()
        .expect("Failed to build request")
}

/// Create a multi-turn conversation request
pub fn multi_turn_request(model: &str) -> CompletionRequest {
    CompletionRequest::builder()
        .model(model)
        .messages(vec![
            ChatMessage::user("What is 2+2?"),
            ChatMessage::assistant("4"),
            ChatMessage::user("And times 3?"),
        ])
        .build()
        .expect("Failed to build request")
}

/// A fake backend CLI living in a temporary directory
///
/// Every run appends to a call log and records its arguments, so tests
/// can check what the agent sent and how often it ran.
pub struct FakeBackend {
    dir: TempDir,
    script: PathBuf,
}

impl FakeBackend {
    /// Backend that prints `reply` and exits 0
    pub fn replying(reply: &str) -> Self {
        let backend = Self::with_body("cat \"$DIR/reply\"");
        std::fs::write(backend.file("reply"), reply).expect("write reply");
        backend
    }

    /// Backend that writes `stderr` and exits with `code`
    pub fn failing(code: i32, stderr: &str) -> Self {
        let backend = Self::with_body(&format!("cat \"$DIR/stderr\" >&2\nexit {code}"));
        std::fs::write(backend.file("stderr"), stderr).expect("write stderr");
        backend
    }

    /// Backend that records its pid and never finishes on its own
    pub fn hanging() -> Self {
        Self::with_body("echo $$ > \"$DIR/pid\"\nexec sleep 30")
    }

    /// Backend that starts a long-running helper, records the helper's pid
    /// and waits for it
    pub fn spawning_helper() -> Self {
        Self::with_body("sleep 30 &\necho $! > \"$DIR/pid\"\nwait")
    }

    fn with_body(body: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let script = dir.path().join("backend.sh");
        let contents = format!(
            "DIR='{}'\necho run >> \"$DIR/calls\"\nprintf '%s\\000' \"$@\" > \"$DIR/args\"\n{body}\n",
            dir.path().display()
        );
        std::fs::write(&script, contents).expect("write script");
        Self { dir, script }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Agent configuration that runs this backend
    pub fn config(&self) -> AgentConfig {
        AgentConfig::new(SHELL)
            .with_arg(self.script.display().to_string())
            .with_timeout(Duration::from_secs(10))
    }

    /// Path of the backend script
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Number of times the backend ran
    pub fn invocations(&self) -> usize {
        std::fs::read_to_string(self.file("calls"))
            .map(|calls| calls.lines().count())
            .unwrap_or(0)
    }

    /// Arguments of the most recent run
    pub fn last_args(&self) -> Vec<String> {
        std::fs::read(self.file("args"))
            .map(|raw| {
                raw.split(|b| *b == 0)
                    .filter(|arg| !arg.is_empty())
                    .map(|arg| String::from_utf8_lossy(arg).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pid recorded by a hanging backend or its helper
    pub fn pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.file("pid"))
            .ok()
            .and_then(|pid| pid.trim().parse().ok())
    }
}

/// Agent configuration pointing at an executable that does not exist
pub fn missing_backend() -> AgentConfig {
    AgentConfig::new("/nonexistent/agent-cli").with_timeout(Duration::from_secs(5))
}

/// Whether a process with `pid` is still running
///
/// A killed process nobody has reaped yet is a zombie and counts as dead.
pub fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| state != 'Z' && state != 'X'),
        Err(_) => std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok_and(|status| status.success()),
    }
}
