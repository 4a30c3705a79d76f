//! Invocation of the system `git` binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use tandem_core::{GitSyncError, Result};

use super::ssh::SshSession;

const AUTH_MARKERS: &[&str] = &[
    "Permission denied",
    "Host key verification failed",
    "Authentication failed",
    "could not read Username",
    "no supported authentication methods",
];

const REMOTE_MARKERS: &[&str] = &[
    "does not appear to be a git repository",
    "does not exist",
    "Repository not found",
    "repository not found",
    "Could not resolve host",
    "Could not resolve hostname",
    "Connection refused",
    "Connection timed out",
    "unable to access",
    "No route to host",
    "not a valid remote",
    "Name or service not known",
];

/// Captured result of a git invocation.
#[derive(Debug)]
pub(crate) struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// stdout and stderr joined, trimmed.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// A git command bound to a working directory.
pub(crate) struct GitCommand {
    action: &'static str,
    dir: PathBuf,
    config: Vec<String>,
    args: Vec<OsString>,
    ssh_command: Option<String>,
    network: bool,
}

impl GitCommand {
    /// Creates a command for `action`, run from `dir`.
    pub fn new(action: &'static str, dir: &Path) -> Self {
        Self {
            action,
            dir: dir.to_path_buf(),
            config: vec!["core.quotePath=false".to_string()],
            args: Vec::new(),
            ssh_command: None,
            network: false,
        }
    }

    /// Adds a `-c key=value` override.
    pub fn config(mut self, key: &str, value: &str) -> Self {
        self.config.push(format!("{}={}", key, value));
        self
    }

    /// Sets the author and committer identity.
    pub fn identity(self, name: &str, email: &str) -> Self {
        self.config("user.name", name)
            .config("user.email", email)
            .config("commit.gpgsign", "false")
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Marks the command as talking to a remote, authenticating with `session`.
    pub fn remote(mut self, session: &SshSession) -> Self {
        self.ssh_command = Some(session.ssh_command().to_string());
        self.network = true;
        self
    }

    /// Runs the command and captures its output regardless of exit status.
    pub fn output(self) -> Result<GitOutput> {
        let mut cmd = Command::new("git");
        for entry in &self.config {
            cmd.arg("-c").arg(entry);
        }
        cmd.args(&self.args)
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C");
        if let Some(ssh) = &self.ssh_command {
            cmd.env("GIT_SSH_COMMAND", ssh);
        }

        debug!(
            "git {} in {:?}",
            self.args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" "),
            self.dir
        );

        let output = cmd.output().map_err(|e| {
            GitSyncError::git_action(self.action, format!("failed to run git: {}", e))
        })?;

        Ok(GitOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs the command, failing on a non-zero exit status.
    pub fn run(self) -> Result<String> {
        let action = self.action;
        let network = self.network;
        let output = self.output()?;

        if output.success {
            Ok(output.stdout)
        } else {
            Err(classify_failure(action, network, &output.combined()))
        }
    }
}

/// Maps git's diagnostic output onto the error taxonomy.
///
/// Transport and authentication classes only apply to commands that
/// reached out to a remote.
pub(crate) fn classify_failure(action: &str, network: bool, detail: &str) -> GitSyncError {
    let detail = detail.trim();

    if network {
        if AUTH_MARKERS.iter().any(|m| detail.contains(m)) {
            return GitSyncError::AuthenticationFailure(
                "SSH Key is not configured properly. Please try again by reconfiguring the SSH key"
                    .to_string(),
            );
        }
        if REMOTE_MARKERS.iter().any(|m| detail.contains(m)) {
            return GitSyncError::InvalidRemote(detail.lines().last().unwrap_or(detail).to_string());
        }
    }

    GitSyncError::git_action(action, detail)
}
