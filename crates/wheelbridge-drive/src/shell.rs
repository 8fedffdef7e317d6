//! Driver that pipes command lines into a shell client process.
//!
//! Each call spawns the configured argv, writes the command lines to its
//! stdin, closes stdin and waits for the exit status. The reference robot
//! is reached through `adb shell` into a node-based bot shell client that
//! reads one command per line.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use wheelbridge_core::ActuationError;

use crate::driver::ActuatorDriver;

/// How to reach the bot shell client.
#[derive(Clone, Debug)]
pub struct ShellDriverConfig {
    /// Program and arguments; stdin receives the command lines.
    pub command: Vec<String>,
    /// Motor id of the left wheel.
    pub left_wheel: u8,
    /// Motor id of the right wheel.
    pub right_wheel: u8,
    /// Kill the child if it has not exited by then.
    pub timeout: Duration,
}

impl Default for ShellDriverConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "adb".into(),
                "shell".into(),
                "su -c 'cd /data/data/com.ohmnilabs.telebot_rtc/files/assets/node-files && ./node bot_shell_client.js'".into(),
            ],
            left_wheel: 0,
            right_wheel: 1,
            timeout: Duration::from_secs(3),
        }
    }
}

/// [`ActuatorDriver`] backed by `tokio::process::Command`.
pub struct ShellDriver {
    config: ShellDriverConfig,
}

impl ShellDriver {
    /// Create a driver. Fails if the argv is empty.
    pub fn new(config: ShellDriverConfig) -> Result<Self, ActuationError> {
        if config.command.is_empty() {
            return Err(ActuationError::Failure("empty actuator command".into()));
        }
        Ok(Self { config })
    }

    /// The lines sent for a wheel-speed pair.
    pub fn wheel_script(&self, left: i32, right: i32) -> String {
        format!(
            "rot {} {left}\nrot {} {right}\n",
            self.config.left_wheel, self.config.right_wheel
        )
    }

    async fn run(&self, script: String) -> Result<(), ActuationError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| ActuationError::Failure("empty actuator command".into()))?;

        let mut cmd = Command::new(program);
        let _ = cmd
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ActuationError::Failure(format!("failed to spawn {program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The client may exit before reading everything; its exit status decides.
            if let Err(e) = stdin.write_all(script.as_bytes()).await {
                debug!(error = %e, "actuator stdin closed early");
            }
        }

        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ActuationError::Failure(format!("wait failed: {e}")));
            }
            Err(_) => {
                warn!(timeout_ms = self.config.timeout.as_millis(), "actuator process timed out");
                return Err(ActuationError::Timeout(self.config.timeout));
            }
        };

        if output.status.success() {
            debug!(script = script.trim_end(), "actuator command accepted");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match output.status.code() {
                Some(code) => format!("exit status {code}: {}", stderr.trim()),
                None => format!("terminated by signal: {}", stderr.trim()),
            };
            Err(ActuationError::Failure(reason))
        }
    }
}

#[async_trait]
impl ActuatorDriver for ShellDriver {
    async fn send_wheel_speeds(&self, left: i32, right: i32) -> Result<(), ActuationError> {
        self.run(self.wheel_script(left, right)).await
    }

    async fn send_raw_command(&self, command: &str) -> Result<(), ActuationError> {
        self.run(format!("{}\n", command.trim_end())).await
    }
}
