//! Shared test doubles for application service tests.
//!
//! Hand-written mocks with shared call logs so a test can hand one copy to
//! the code under test and inspect another.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::application::ports::{CommandOperator, HostSystem, OperatorConnector, ProgressReporter};
use crate::domain::error::OperatorError;
use crate::domain::layout::SYSTEMD_RUN_DIR;
use crate::domain::target::Target;

/// Build an `ExitStatus` from a logical exit code.
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

pub fn output(code: i32, stdout: &[u8]) -> std::process::Output {
    std::process::Output {
        status: exit_status(code),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

/// One recorded operator interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpCall {
    Execute(String),
    Upload { destination: String, mode: u32, content: Vec<u8> },
    UploadFile { local: String, destination: String, mode: u32 },
    Close,
}

impl OpCall {
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Upload { destination, .. } | Self::UploadFile { destination, .. } => {
                Some(destination)
            }
            _ => None,
        }
    }
}

/// `CommandOperator` that records every call and fails on request.
#[derive(Clone, Default)]
pub struct RecordingOperator {
    pub log: Arc<Mutex<Vec<OpCall>>>,
    /// Uploads whose destination ends with this suffix fail.
    pub fail_upload_suffix: Option<String>,
    /// Commands containing this text exit with status 1.
    pub fail_command_containing: Option<String>,
    /// Output returned by every command.
    pub command_output: String,
    /// `close` fails after recording the call.
    pub fail_close: bool,
}

impl RecordingOperator {
    pub fn calls(&self) -> Vec<OpCall> {
        self.log.lock().expect("log lock").clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OpCall::Execute(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.destination().map(str::to_string))
            .collect()
    }

    fn record(&self, call: OpCall) {
        self.log.lock().expect("log lock").push(call);
    }

    fn check_upload(&self, destination: &str) -> Result<()> {
        if let Some(suffix) = &self.fail_upload_suffix
            && destination.ends_with(suffix.as_str())
        {
            return Err(OperatorError::Upload {
                destination: destination.to_string(),
                reason: "simulated failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl CommandOperator for RecordingOperator {
    async fn execute(&self, command: &str) -> Result<String> {
        self.record(OpCall::Execute(command.to_string()));
        if let Some(needle) = &self.fail_command_containing
            && command.contains(needle.as_str())
        {
            return Err(OperatorError::Command {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                output: self.command_output.clone(),
            }
            .into());
        }
        Ok(self.command_output.clone())
    }

    async fn upload(&self, content: &[u8], destination: &str, mode: u32) -> Result<()> {
        self.record(OpCall::Upload {
            destination: destination.to_string(),
            mode,
            content: content.to_vec(),
        });
        self.check_upload(destination)
    }

    async fn upload_file(&self, local: &Path, destination: &str, mode: u32) -> Result<()> {
        self.record(OpCall::UploadFile {
            local: local.display().to_string(),
            destination: destination.to_string(),
            mode,
        });
        self.check_upload(destination)
    }

    async fn close(&self) -> Result<()> {
        self.record(OpCall::Close);
        if self.fail_close {
            anyhow::bail!("ssh -O exit failed");
        }
        Ok(())
    }
}

/// Connector handing out clones of one `RecordingOperator`.
#[derive(Default)]
pub struct RecordingConnector {
    pub operator: RecordingOperator,
    pub targets: Mutex<Vec<Target>>,
    pub refuse: bool,
}

impl RecordingConnector {
    pub fn connects(&self) -> usize {
        self.targets.lock().expect("targets lock").len()
    }
}

impl OperatorConnector for RecordingConnector {
    type Operator = RecordingOperator;

    async fn connect(&self, target: &Target) -> Result<Self::Operator> {
        self.targets.lock().expect("targets lock").push(target.clone());
        if self.refuse {
            return Err(OperatorError::Connection {
                target: target.to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(self.operator.clone())
    }
}

/// Reporter that keeps every message.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: RefCell<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.borrow_mut().push(format!("step: {message}"));
    }

    fn success(&self, message: &str) {
        self.messages.borrow_mut().push(format!("success: {message}"));
    }

    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(format!("warn: {message}"));
    }
}

/// In-memory `HostSystem` that interprets the commands the reconciler runs.
///
/// `curl` serves bodies from `downloads`, `unzip` places the archive bytes at
/// `<dir>/consul`, and running the installed binary with `version` prints its
/// content, so a fake binary of `b"Consul v1.9.0\n"` reports version 1.9.0.
pub struct FakeHost {
    pub files: RefCell<HashMap<PathBuf, (Vec<u8>, u32)>>,
    pub commands: RefCell<HashSet<String>>,
    pub users: RefCell<HashSet<String>>,
    pub downloads: HashMap<String, Vec<u8>>,
    pub machine: String,
    pub systemd: bool,
    /// Programs that exit with status 1.
    pub failing: HashSet<String>,
    log: RefCell<Vec<String>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            files: RefCell::default(),
            commands: RefCell::default(),
            users: RefCell::default(),
            downloads: HashMap::new(),
            machine: "x86_64".to_string(),
            systemd: true,
            failing: HashSet::new(),
            log: RefCell::default(),
        }
    }
}

impl FakeHost {
    pub fn with_commands(commands: &[&str]) -> Self {
        let host = Self::default();
        host.commands
            .borrow_mut()
            .extend(commands.iter().map(|c| (*c).to_string()));
        host
    }

    pub fn put(&self, path: &str, content: &[u8], mode: u32) {
        self.files
            .borrow_mut()
            .insert(PathBuf::from(path), (content.to_vec(), mode));
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(Path::new(path)).map(|(c, _)| c.clone())
    }

    /// Every command run so far, as `program arg arg`.
    pub fn runs(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear_runs(&self) {
        self.log.borrow_mut().clear();
    }

    fn copy(&self, from: &str, to: &str) -> bool {
        let mut files = self.files.borrow_mut();
        let Some(entry) = files.get(Path::new(from)).cloned() else {
            return false;
        };
        files.insert(PathBuf::from(to), entry);
        true
    }

    fn simulate(&self, program: &str, args: &[&str]) -> (i32, Vec<u8>) {
        if self.failing.contains(program) {
            return (1, b"simulated failure".to_vec());
        }
        match (program, args) {
            ("uname", ["-m"]) => (0, format!("{}\n", self.machine).into_bytes()),
            ("id", [user]) => (i32::from(!self.users.borrow().contains(*user)), Vec::new()),
            ("useradd", [.., user]) => {
                self.users.borrow_mut().insert((*user).to_string());
                (0, Vec::new())
            }
            ("cp", [from, to]) => (i32::from(!self.copy(from, to)), Vec::new()),
            ("mv", ["-f", from, to]) => {
                let moved = self.copy(from, to);
                self.files.borrow_mut().remove(Path::new(from));
                (i32::from(!moved), Vec::new())
            }
            ("chmod", [mode, path]) => {
                let mode = u32::from_str_radix(mode, 8).unwrap_or(0);
                match self.files.borrow_mut().get_mut(Path::new(path)) {
                    Some(entry) => {
                        entry.1 = mode;
                        (0, Vec::new())
                    }
                    None => (1, b"No such file or directory".to_vec()),
                }
            }
            ("curl", ["-o", dest, "-sfL", url]) => match self.downloads.get(*url) {
                Some(body) => {
                    self.put(dest, body, 0o644);
                    (0, Vec::new())
                }
                None => (22, b"curl: (22) The requested URL returned error: 404".to_vec()),
            },
            ("unzip", ["-qq", "-o", archive, "-d", dir]) => match self.content(archive) {
                Some(body) => {
                    self.put(&format!("{dir}/consul"), &body, 0o755);
                    (0, Vec::new())
                }
                None => (9, b"cannot find zipfile".to_vec()),
            },
            ("apt-get" | "yum", ["install", "-y", packages @ ..]) => {
                self.commands
                    .borrow_mut()
                    .extend(packages.iter().map(|p| (*p).to_string()));
                (0, Vec::new())
            }
            (bin, ["version"]) => match self.content(bin) {
                Some(body) => (0, body),
                None => (127, Vec::new()),
            },
            _ => (0, Vec::new()),
        }
    }
}

impl HostSystem for FakeHost {
    async fn run(&self, program: &str, args: &[&str]) -> Result<std::process::Output> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.log.borrow_mut().push(line);
        let (code, stdout) = self.simulate(program, args);
        Ok(output(code, &stdout))
    }

    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.files.borrow().get(path).map(|(c, _)| c.clone()))
    }

    async fn write_file(&self, path: &Path, content: &[u8], mode: u32) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), (content.to_vec(), mode));
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        if path == Path::new(SYSTEMD_RUN_DIR) {
            return self.systemd;
        }
        self.files.borrow().contains_key(path)
    }

    async fn is_executable(&self, path: &Path) -> bool {
        self.files
            .borrow()
            .get(path)
            .is_some_and(|(_, mode)| mode & 0o111 != 0)
    }

    async fn has_command(&self, name: &str) -> bool {
        self.commands.borrow().contains(name)
    }
}
