// src/tasks/tool.rs

//! External tool invocation.
//!
//! A tool is a shell command template from `[tools]`. Placeholders are
//! substituted with shell-quoted paths, then the command runs through the
//! platform shell with `NODE_ENV` set to the build mode.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::MODE_VAR;
use crate::types::BuildMode;

use super::{TaskId, TaskOutcome};

/// Number of stderr lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

/// One concrete run of a command template.
#[derive(Debug, Clone)]
pub struct ToolInvocation<'a> {
    pub task: TaskId,
    pub template: &'a str,
    pub input: &'a Path,
    pub output: &'a Path,
    pub output_dir: &'a Path,
    pub mode: BuildMode,
    /// Working directory (the project root).
    pub cwd: &'a Path,
}

impl ToolInvocation<'_> {
    /// Expand placeholders into the final command line.
    pub fn command_line(&self) -> String {
        expand(
            self.template,
            &[
                ("{input}", shell_quote(&self.input.to_string_lossy())),
                ("{output}", shell_quote(&self.output.to_string_lossy())),
                ("{output_dir}", shell_quote(&self.output_dir.to_string_lossy())),
                ("{mode}", self.mode.as_str().to_string()),
            ],
        )
    }
}

/// Replace every placeholder in a single left-to-right pass, so substituted
/// values are never expanded again.
pub fn expand(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'outer: while !rest.is_empty() {
        if rest.starts_with('{') {
            for (key, value) in vars {
                if let Some(tail) = rest.strip_prefix(key) {
                    out.push_str(value);
                    rest = tail;
                    continue 'outer;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Quote a value for the platform shell if it contains anything unusual.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,".contains(c) || (cfg!(windows) && c == '\\'));
    if plain {
        return value.to_string();
    }

    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Run the tool and map its exit status to a [`TaskOutcome`].
///
/// Spawn failures are reported as `Failed` as well; the caller never sees an
/// error.
pub async fn run_tool(inv: &ToolInvocation<'_>) -> TaskOutcome {
    match run_tool_inner(inv).await {
        Ok(outcome) => outcome,
        Err(err) => TaskOutcome::failed(format!("{err:#}")),
    }
}

async fn run_tool_inner(inv: &ToolInvocation<'_>) -> Result<TaskOutcome> {
    let line = inv.command_line();
    info!(task = %inv.task, cmd = %line, "starting tool");

    let output_dir = inv.cwd.join(inv.output_dir);
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("creating output dir {:?}", output_dir))?;

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&line);
        c
    };

    cmd.current_dir(inv.cwd)
        .env(MODE_VAR, inv.mode.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning tool for task '{}'", inv.task))?;

    // Always consume stdout so buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        let task = inv.task;
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stdout: {}", line);
            }
        });
    }

    let stderr_tail = child.stderr.take().map(|stderr| {
        let task = inv.task;
        tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for tool of task '{}'", inv.task))?;

    let tail = match stderr_tail {
        Some(handle) => handle.await.unwrap_or_default(),
        None => VecDeque::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        task = %inv.task,
        exit_code = code,
        success = status.success(),
        "tool exited"
    );

    if status.success() {
        return Ok(TaskOutcome::success(format!(
            "{} -> {}",
            inv.input.display(),
            inv.output.display()
        )));
    }

    let mut message = format!("`{line}` exited with code {code}");
    if !tail.is_empty() {
        message.push('\n');
        message.push_str(&Vec::from(tail).join("\n"));
    }
    Ok(TaskOutcome::failed(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn invocation<'a>(template: &'a str, input: &'a Path, output: &'a Path, cwd: &'a Path) -> ToolInvocation<'a> {
        ToolInvocation {
            task: TaskId::CompileStyles,
            template,
            input,
            output,
            output_dir: output.parent().unwrap_or(output),
            mode: BuildMode::Production,
            cwd,
        }
    }

    #[test]
    fn expand_replaces_each_placeholder_once() {
        let vars = [
            ("{input}", "a{output}".to_string()),
            ("{output}", "b".to_string()),
        ];
        assert_eq!(expand("x {input} {output} {other}", &vars), "x a{output} b {other}");
    }

    #[cfg(unix)]
    #[test]
    fn shell_quote_leaves_plain_paths_alone() {
        assert_eq!(shell_quote("src/scss/app.scss"), "src/scss/app.scss");
        assert_eq!(shell_quote("my file.scss"), "'my file.scss'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn command_line_substitutes_paths_and_mode() {
        let input = PathBuf::from("src/scss/style.scss");
        let output = PathBuf::from("build/css/style.css");
        let cwd = PathBuf::from(".");
        let inv = invocation("sass {input} {output} --{mode} -o {output_dir}", &input, &output, &cwd);
        assert_eq!(
            inv.command_line(),
            "sass src/scss/style.scss build/css/style.css --production -o build/css"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_reports_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let input = PathBuf::from("in.scss");
        let output = PathBuf::from("out.css");
        let inv = invocation("echo broken >&2; exit 3", &input, &output, dir.path());

        match run_tool(&inv).await {
            TaskOutcome::Failed { message } => {
                assert!(message.contains("exited with code 3"), "{message}");
                assert!(message.contains("broken"), "{message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_sees_mode_in_environment() {
        let dir = tempfile::tempdir().unwrap();
        let input = PathBuf::from("in");
        let output = dir.path().join("mode.txt");
        let template = "printf %s \"$NODE_ENV\" > {output}";
        let inv = invocation(template, &input, &output, dir.path());

        assert!(matches!(run_tool(&inv).await, TaskOutcome::Success { .. }));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "production");
    }
}
