//! Executor for a remote deployment target over SSH
//!
//! Every operation is a single `ssh` invocation built from an argument
//! vector; each word of the remote command is quoted individually, so no
//! path or identifier is ever interpolated into a shell string.

use std::process::{Command, Output};
use std::time::Duration;

use camino::Utf8Path;

use super::{ExecError, RemoteExecutor};

/// Runs each operation on a remote host via `ssh`.
pub struct SshExecutor {
    host: String,
    port: Option<u16>,
    connect_timeout: Duration,
}

impl SshExecutor {
    /// Create an executor for `target`, given as "user@host" or
    /// "user@host:port".
    pub fn new(target: &str, connect_timeout: Duration) -> Self {
        let (host, port) = parse_target(target);
        Self {
            host,
            port,
            connect_timeout,
        }
    }

    fn run(&self, op: &'static str, argv: &[&str]) -> Result<Output, ExecError> {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()));
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        cmd.arg(&self.host);
        cmd.arg(remote_command(argv));

        tracing::debug!(op, host = %self.host, "Running remote operation");
        let output = cmd.output()?;
        Ok(output)
    }

    fn run_checked(&self, op: &'static str, argv: &[&str]) -> Result<Output, ExecError> {
        let output = self.run(op, argv)?;
        if !output.status.success() {
            return Err(command_failed(op, &output));
        }
        Ok(output)
    }
}

impl RemoteExecutor for SshExecutor {
    fn list_directory(&self, path: &Utf8Path) -> Result<Vec<String>, ExecError> {
        let output = self.run_checked("list_directory", &["ls", "-1", "--", path.as_str()])?;
        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    fn make_directory(&self, path: &Utf8Path) -> Result<(), ExecError> {
        self.run_checked("make_directory", &["mkdir", "-p", "--", path.as_str()])?;
        Ok(())
    }

    fn create_directory(&self, path: &Utf8Path) -> Result<(), ExecError> {
        self.run_checked("create_directory", &["mkdir", "--", path.as_str()])?;
        Ok(())
    }

    fn copy_tree(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError> {
        self.run_checked("copy_tree", &["cp", "-R", "--", src.as_str(), dst.as_str()])?;
        Ok(())
    }

    fn remove_tree(&self, path: &Utf8Path) -> Result<(), ExecError> {
        self.run_checked("remove_tree", &["rm", "-rf", "--", path.as_str()])?;
        Ok(())
    }

    fn create_symlink(&self, target: &Utf8Path, link: &Utf8Path) -> Result<(), ExecError> {
        self.run_checked(
            "create_symlink",
            &["ln", "-s", "--", target.as_str(), link.as_str()],
        )?;
        Ok(())
    }

    fn atomic_rename(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError> {
        self.run_checked(
            "atomic_rename",
            &["mv", "-T", "-f", "--", src.as_str(), dst.as_str()],
        )?;
        Ok(())
    }

    fn exists(&self, path: &Utf8Path) -> Result<bool, ExecError> {
        let output = self.run("exists", &["test", "-e", path.as_str()])?;
        // test(1) exits 1 when the path is absent; anything else (e.g. ssh's
        // own 255 on a connection failure) is a real error
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_failed("exists", &output)),
        }
    }
}

fn command_failed(op: &'static str, output: &Output) -> ExecError {
    ExecError::CommandFailed {
        op: op.to_string(),
        status: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Split "user@host:port" into the host part and an optional port.
///
/// A trailing ":..." that does not parse as a port is left on the host.
fn parse_target(target: &str) -> (String, Option<u16>) {
    if let Some((host, port_str)) = target.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), Some(port));
        }
    }
    (target.to_string(), None)
}

/// Join an argument vector into a remote command line, quoting each word.
fn remote_command(argv: &[&str]) -> String {
    argv.iter()
        .map(|word| shell_quote(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-quote a word for the remote shell unless it is plainly safe.
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=@:".contains(c));
    if safe {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
