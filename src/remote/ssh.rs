//! Remote command execution over ssh

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::{KvBenchError, Result};

/// Runs shell commands on remote hosts through an ssh-compatible program
#[derive(Debug, Clone)]
pub struct SshRunner {
    program: String,
    user: Option<String>,
    identity_file: Option<PathBuf>,
    port: Option<u16>,
    connect_timeout: Duration,
}

impl SshRunner {
    /// Create a runner using `program` with default options
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            user: None,
            identity_file: None,
            port: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Create a runner from the remote section of the configuration
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            program: config.ssh_program.clone(),
            user: config.user.clone(),
            identity_file: config.identity_file.clone(),
            port: config.ssh_port,
            connect_timeout: config.connect_timeout,
        }
    }

    /// Arguments passed to the ssh program to run `command` on `host`
    pub fn args(&self, host: &str, command: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-o".into(), "BatchMode=yes".into()];

        let timeout_secs = self.connect_timeout.as_secs().max(1);
        args.push("-o".into());
        args.push(format!("ConnectTimeout={}", timeout_secs).into());

        if let Some(identity) = &self.identity_file {
            args.push("-i".into());
            args.push(identity.clone().into_os_string());
        }
        if let Some(port) = self.port {
            args.push("-p".into());
            args.push(port.to_string().into());
        }

        let target = match &self.user {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        };
        args.push(target.into());
        args.push(command.into());
        args
    }

    /// Run `command` on `host` and return its trimmed stdout
    ///
    /// A non-zero exit status is reported as [`KvBenchError::RemoteError`]
    /// carrying the remote stderr.
    pub async fn run(&self, host: &str, command: &str) -> Result<String> {
        debug!(host, command, "running remote command");
        let output = Command::new(&self.program)
            .args(self.args(host, command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(host, status = %output.status, %stderr, "remote command failed");
            return Err(KvBenchError::RemoteError(format!(
                "`{}` on {} exited with {}: {}",
                command, host, output.status, stderr
            )));
        }

        Ok(stdout)
    }
}
