//! Detached agent process launching
//!
//! The launcher never waits for the downstream tool: it writes the initial
//! status record, renders a launch script that owns all further status
//! writes, starts the script in its own process group, and returns. The
//! calling process may exit while the agent keeps running.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, RunnerError};
use crate::status::{write_record_atomic, StatusRecord, StatusStore};

/// Approval mode forwarded to the downstream agent tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    /// All actions auto-approved
    Yolo,
    /// Edits auto-approved, everything else prompts
    AutoEdit,
    /// Downstream tool's default prompting
    Default,
}

impl ApprovalMode {
    /// Parse an approval mode from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yolo" => Ok(Self::Yolo),
            "auto_edit" | "auto-edit" => Ok(Self::AutoEdit),
            "default" => Ok(Self::Default),
            _ => Err(RunnerError::InvalidApprovalMode {
                mode: s.to_string(),
            }),
        }
    }

    /// Get the flag value passed to the downstream tool
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yolo => "yolo",
            Self::AutoEdit => "auto_edit",
            Self::Default => "default",
        }
    }
}

/// Configuration for AgentLauncher
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Command for the downstream agent tool
    pub agent_command: String,
    /// Terminal emulators tried in order for visible sessions
    pub terminal_candidates: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            agent_command: "gemini".to_string(),
            terminal_candidates: vec![
                "x-terminal-emulator".to_string(),
                "gnome-terminal".to_string(),
                "konsole".to_string(),
                "xterm".to_string(),
                "alacritty".to_string(),
            ],
        }
    }
}

/// Options for a single spawn
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Directory the agent works in
    pub work_dir: PathBuf,
    /// Approval mode for the downstream tool
    pub approval_mode: ApprovalMode,
    /// Open a visible terminal instead of running headless
    pub use_terminal: bool,
    /// Feature name keying the status record; `agent` if absent
    pub feature_name: Option<String>,
}

/// How the agent process ended up running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// Visible in a new terminal window
    Terminal,
    /// Fully backgrounded
    Background,
}

/// Result of a successful spawn
#[derive(Debug, Clone)]
pub struct SpawnHandle {
    /// Agent name keying the status record
    pub agent: String,
    /// Log file tee'd from the agent's output
    pub log_path: PathBuf,
    /// Status record file
    pub status_path: PathBuf,
    /// Process id of the detached script
    pub pid: u32,
    /// How the process was started
    pub mode: SpawnMode,
}

/// Launches agent processes decoupled from the caller's lifetime
#[derive(Debug)]
pub struct AgentLauncher {
    /// Root of the invoking project (logs directory lives here)
    project_root: PathBuf,
    /// Configuration
    config: LauncherConfig,
}

impl AgentLauncher {
    /// Create a launcher for the given project root
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_config(project_root, LauncherConfig::default())
    }

    /// Create a launcher with custom configuration
    pub fn with_config(project_root: impl Into<PathBuf>, config: LauncherConfig) -> Self {
        Self {
            project_root: project_root.into(),
            config,
        }
    }

    /// Spawn a detached agent process for the given prompt
    ///
    /// Fatal errors here are synchronous: a missing logs directory that
    /// cannot be created, an unwritable script, or a process that will not
    /// start. Anything that goes wrong after the process is up is reported
    /// only through the status record.
    pub async fn spawn(&self, prompt: &str, options: SpawnOptions) -> Result<SpawnHandle> {
        let store = StatusStore::new(&self.project_root);
        tokio::fs::create_dir_all(store.logs_dir())
            .await
            .map_err(|e| {
                RunnerError::spawn_failed_with_source("Failed to create logs directory", e)
            })?;

        let agent = options
            .feature_name
            .clone()
            .unwrap_or_else(|| "agent".to_string());
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let log_path = store.logs_dir().join(format!("{}-{}.log", agent, timestamp));
        let status_path = store.status_path(&agent);

        let record = StatusRecord::running(&agent);
        write_record_atomic(&status_path, &record).await?;

        let script = render_launch_script(&ScriptContext {
            work_dir: &options.work_dir,
            agent: &agent,
            approval_mode: options.approval_mode,
            agent_command: &self.config.agent_command,
            prompt,
            log_path: &log_path,
            status_path: &status_path,
            initial_record: &record,
        })?;

        let script_path =
            std::env::temp_dir().join(format!("hive-agent-{}.sh", Uuid::new_v4().as_hyphenated()));
        tokio::fs::write(&script_path, script).await?;

        let (child, mode) = if options.use_terminal {
            match self.spawn_in_terminal(&script_path, &options.work_dir) {
                Some(child) => (child, SpawnMode::Terminal),
                None => {
                    warn!("No terminal emulator available; running agent in background");
                    (
                        spawn_background(&script_path, &options.work_dir)?,
                        SpawnMode::Background,
                    )
                }
            }
        } else {
            (
                spawn_background(&script_path, &options.work_dir)?,
                SpawnMode::Background,
            )
        };

        info!("Spawned agent {} (pid {})", agent, child.id());

        Ok(SpawnHandle {
            agent,
            log_path,
            status_path,
            pid: child.id(),
            mode,
        })
    }

    /// Try each terminal emulator until one starts
    fn spawn_in_terminal(&self, script_path: &Path, work_dir: &Path) -> Option<Child> {
        let mut candidates = Vec::new();
        if let Ok(term) = std::env::var("TERMINAL") {
            if !term.is_empty() {
                candidates.push(term);
            }
        }
        candidates.extend(self.config.terminal_candidates.iter().cloned());

        for term in candidates {
            let mut cmd = Command::new(&term);
            // gnome-terminal takes the command after `--`, the rest use -e
            if term.ends_with("gnome-terminal") {
                cmd.arg("--");
            } else {
                cmd.arg("-e");
            }
            cmd.arg("bash")
                .arg(script_path)
                .current_dir(work_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            detach(&mut cmd);

            match cmd.spawn() {
                Ok(child) => {
                    debug!("Opened agent terminal via {}", term);
                    return Some(child);
                }
                Err(e) => debug!("Terminal {} unavailable: {}", term, e),
            }
        }

        None
    }
}

/// Start the launch script headless in its own process group
fn spawn_background(script_path: &Path, work_dir: &Path) -> Result<Child> {
    let mut cmd = Command::new("bash");
    cmd.arg(script_path)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);

    cmd.spawn()
        .map_err(|e| RunnerError::spawn_failed_with_source("Failed to start agent script", e))
}

/// Put the child in its own process group so it survives the caller
fn detach(cmd: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = cmd;
}

struct ScriptContext<'a> {
    work_dir: &'a Path,
    agent: &'a str,
    approval_mode: ApprovalMode,
    agent_command: &'a str,
    prompt: &'a str,
    log_path: &'a Path,
    status_path: &'a Path,
    initial_record: &'a StatusRecord,
}

/// Render the bash script that wraps the downstream tool
///
/// The script re-asserts the initial record inside the execution
/// environment, tees the tool's output into the log file, and writes the
/// terminal record itself: the launcher never observes completion. Status
/// writes go through a temp-file-then-rename helper so they stay whole-file
/// atomic.
fn render_launch_script(ctx: &ScriptContext<'_>) -> Result<String> {
    let quote = |s: &str| -> Result<String> {
        shlex::try_quote(s)
            .map(|q| q.into_owned())
            .map_err(|_| RunnerError::spawn_failed("Prompt or path contains a NUL byte"))
    };

    let started_ts = ctx
        .initial_record
        .started
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));

    let initial_json = serde_json::to_string(ctx.initial_record)?;
    let complete_json = serde_json::json!({
        "status": "complete",
        "started": started_ts,
        "completed": "@COMPLETED@",
        "agent": ctx.agent,
    })
    .to_string();
    let error_json = serde_json::json!({
        "status": "error",
        "started": started_ts,
        "completed": "@COMPLETED@",
        "agent": ctx.agent,
        "error": "agent exited with status @EXIT_CODE@",
    })
    .to_string();

    Ok(format!(
        r#"#!/usr/bin/env bash
set -o pipefail

AGENT={agent}
STATUS_FILE={status_file}
LOG_FILE={log_file}
PROMPT={prompt}

write_status() {{
    tmp="$STATUS_FILE.tmp.$$"
    printf '%s\n' "$1" > "$tmp" && mv "$tmp" "$STATUS_FILE"
}}

cd {work_dir} || exit 1

write_status {initial_json}

echo "==========================================="
echo " Agent starting: $AGENT"
echo " Mode: {mode}"
echo " Log: $LOG_FILE"
echo "==========================================="

{agent_command} --approval-mode {mode} "$PROMPT" 2>&1 | tee "$LOG_FILE"
exit_code=$?

ts=$(date -u +%FT%TZ)
if [ "$exit_code" -eq 0 ]; then
    json={complete_json}
else
    json={error_json}
    json=${{json//@EXIT_CODE@/$exit_code}}
fi
json=${{json//@COMPLETED@/$ts}}
write_status "$json"

echo ""
echo " Agent finished (exit $exit_code)"
"#,
        agent = quote(ctx.agent)?,
        status_file = quote(&ctx.status_path.to_string_lossy())?,
        log_file = quote(&ctx.log_path.to_string_lossy())?,
        prompt = quote(ctx.prompt)?,
        work_dir = quote(&ctx.work_dir.to_string_lossy())?,
        initial_json = quote(&initial_json)?,
        complete_json = quote(&complete_json)?,
        error_json = quote(&error_json)?,
        agent_command = quote(ctx.agent_command)?,
        mode = ctx.approval_mode.as_str(),
    ))
}
