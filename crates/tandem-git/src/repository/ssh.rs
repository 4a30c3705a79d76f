//! Short-lived SSH identities for network git commands.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use tandem_core::{GitCredential, Result};

/// An SSH identity usable by exactly one git invocation.
///
/// The private key lives in a temporary file outside any worktree,
/// readable only by the current user, and is removed when the session is
/// dropped.
pub struct SshSession {
    key_file: NamedTempFile,
    ssh_command: String,
}

impl SshSession {
    /// Validates `credential` and stages its private key for ssh.
    pub fn open(credential: &GitCredential) -> Result<Self> {
        credential.validate()?;

        let mut key_file = tempfile::Builder::new().prefix("tandem-key-").tempfile()?;
        let key = credential.private_key().expose();
        key_file.write_all(key.as_bytes())?;
        if !key.ends_with('\n') {
            key_file.write_all(b"\n")?;
        }
        key_file.flush()?;

        let ssh_command = format!(
            "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new -o BatchMode=yes",
            shell_quote(key_file.path())
        );

        Ok(Self {
            key_file,
            ssh_command,
        })
    }

    /// Value for `GIT_SSH_COMMAND`.
    pub fn ssh_command(&self) -> &str {
        &self.ssh_command
    }

    /// Location of the staged key.
    pub fn key_path(&self) -> &Path {
        self.key_file.path()
    }
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession").finish_non_exhaustive()
    }
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}
