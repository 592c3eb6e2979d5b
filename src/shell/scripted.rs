//! Scripted command runner for tests.
//!
//! # Example
//!
//! ```
//! use imgprep::shell::{CommandOptions, CommandRunner, Invocation, ScriptedRunner};
//!
//! let mut runner = ScriptedRunner::new().respond("import numpy", 0, "1.23.5\n");
//! let log = runner.log();
//!
//! let probe = Invocation::new("python3").args(["-c", "import numpy; print(numpy.__version__)"]);
//! let result = runner.run(&probe, &CommandOptions::default()).unwrap();
//!
//! assert_eq!(result.last_stdout_line(), Some("1.23.5"));
//! assert_eq!(log.invocations(), vec![probe]);
//! ```

use crate::error::{ProvisionError, Result};
use crate::shell::{CommandOptions, CommandResult, CommandRunner, Invocation};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call the runner received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The invocation.
    pub invocation: Invocation,
    /// Environment passed with it.
    pub env: HashMap<String, String>,
    /// Working directory passed with it.
    pub cwd: Option<PathBuf>,
}

/// Shared view of the calls a [`ScriptedRunner`] received.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<RecordedCall>>>);

impl CallLog {
    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// All recorded invocations in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls().into_iter().map(|c| c.invocation).collect()
    }

    /// Invocations rendered with spaces, for substring assertions.
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations().iter().map(flat).collect()
    }

    /// True if any recorded command line contains `needle`.
    pub fn ran(&self, needle: &str) -> bool {
        self.command_lines().iter().any(|c| c.contains(needle))
    }

    fn push(&self, call: RecordedCall) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call);
        }
    }
}

#[derive(Debug, Clone)]
enum Response {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    SpawnError,
}

/// Command runner answering from a script instead of starting processes.
///
/// Rules match when their pattern is a substring of the command line
/// (program and arguments joined by spaces); the first match wins.
/// Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Response)>,
    log: CallLog,
}

impl ScriptedRunner {
    /// Create a runner where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching commands with an exit code and stdout.
    pub fn respond(mut self, pattern: &str, code: i32, stdout: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Exit {
                code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    /// Answer matching commands with an exit code and stderr.
    pub fn respond_err(mut self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Exit {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    /// Make matching commands fail to start.
    pub fn fail_spawn(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Response::SpawnError));
        self
    }

    /// Handle to the calls this runner receives.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

fn flat(invocation: &Invocation) -> String {
    std::iter::once(invocation.program.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

impl CommandRunner for ScriptedRunner {
    fn run(&mut self, invocation: &Invocation, options: &CommandOptions) -> Result<CommandResult> {
        self.log.push(RecordedCall {
            invocation: invocation.clone(),
            env: options.env.clone(),
            cwd: options.cwd.clone(),
        });

        let line = flat(invocation);
        let response = self
            .rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            None => Ok(CommandResult::success(
                String::new(),
                String::new(),
                Duration::ZERO,
            )),
            Some(Response::SpawnError) => Err(ProvisionError::CommandSpawn {
                program: invocation.program.clone(),
                message: "No such file or directory (os error 2)".to_string(),
            }),
            Some(Response::Exit {
                code,
                stdout,
                stderr,
            }) => {
                if code == 0 {
                    Ok(CommandResult::success(stdout, stderr, Duration::ZERO))
                } else {
                    Ok(CommandResult::failure(
                        Some(code),
                        stdout,
                        stderr,
                        Duration::ZERO,
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_commands_succeed() {
        let mut runner = ScriptedRunner::new();
        let result = runner
            .run(&Invocation::new("apt-get").arg("update"), &CommandOptions::default())
            .unwrap();
        assert!(result.success);
    }

    #[test]
    fn first_matching_rule_wins() {
        let mut runner = ScriptedRunner::new()
            .respond("apt-get install", 100, "")
            .respond("apt-get", 0, "");
        let result = runner
            .run(
                &Invocation::new("apt-get").args(["install", "-y"]),
                &CommandOptions::default(),
            )
            .unwrap();
        assert_eq!(result.exit_code, Some(100));
    }

    #[test]
    fn spawn_failure_is_error() {
        let mut runner = ScriptedRunner::new().fail_spawn("apt-get");
        let err = runner
            .run(&Invocation::new("apt-get"), &CommandOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProvisionError::CommandSpawn { .. }));
    }

    #[test]
    fn log_records_env() {
        let mut runner = ScriptedRunner::new();
        let log = runner.log();
        let mut options = CommandOptions::default();
        options
            .env
            .insert("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string());
        runner.run(&Invocation::new("true"), &options).unwrap();

        let calls = log.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].env.get("DEBIAN_FRONTEND").map(String::as_str),
            Some("noninteractive")
        );
        assert!(log.ran("true"));
    }
}
