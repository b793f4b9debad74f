use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Emulator names whose addresses must be known before the tests can run.
pub const DEFAULT_REQUIRED_EMULATORS: [&str; 2] = ["Authentication", "Database"];

/// Program plus arguments for one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Run `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Polling behaviour for the log tailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailConfig {
    /// Pause between read attempts when no complete line is available.
    pub wait_interval: Duration,
    /// Upper bound on how long a single line may take to be written.
    pub line_timeout: Duration,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            wait_interval: Duration::from_millis(100),
            line_timeout: Duration::from_secs(10),
        }
    }
}

impl TailConfig {
    /// Pause between read attempts.
    pub fn with_wait_interval(mut self, wait: Duration) -> Self {
        self.wait_interval = wait;
        self
    }

    /// Longest wait for a single line to complete.
    pub fn with_line_timeout(mut self, timeout: Duration) -> Self {
        self.line_timeout = timeout;
        self
    }
}

/// Everything one harness run needs: what to launch, where to write, how long to wait.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Long-lived emulator process; its stdout carries the address table.
    pub emulator: CommandSpec,
    /// Test suite executed once the runtime config is written.
    pub test_runner: CommandSpec,
    /// Directory both children run in and relative paths resolve against.
    pub working_directory: Option<PathBuf>,
    /// Emulator stdout capture, truncated on every run.
    pub stdout_log: PathBuf,
    /// Emulator stderr capture, truncated on every run.
    pub stderr_log: PathBuf,
    /// JSON runtime config read by the test suite.
    pub env_file: PathBuf,
    /// Emulators whose addresses must be discovered before continuing.
    pub required_emulators: Vec<String>,
    pub tail: TailConfig,
    /// Overall bound on address discovery, independent of the per-line bound.
    pub address_timeout: Duration,
    /// Bound on the test suite; it is killed once exceeded.
    pub test_timeout: Duration,
    /// Interval between exit checks while waiting on a child.
    pub poll_interval: Duration,
    /// How long the emulators get to exit after SIGTERM before being killed.
    pub shutdown_grace: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            emulator: CommandSpec::new("firebase").with_args([
                "emulators:start",
                "--only",
                "auth,database",
                "--project",
                "testing",
            ]),
            test_runner: CommandSpec::new("cargo").with_arg("test"),
            working_directory: None,
            stdout_log: PathBuf::from("firebase_output"),
            stderr_log: PathBuf::from("firebase_error"),
            env_file: PathBuf::from(".env"),
            required_emulators: DEFAULT_REQUIRED_EMULATORS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            tail: TailConfig::default(),
            address_timeout: Duration::from_secs(60),
            test_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(50),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl RunConfig {
    /// Replace the emulator command.
    pub fn with_emulator(mut self, command: CommandSpec) -> Self {
        self.emulator = command;
        self
    }

    /// Replace the test suite command.
    pub fn with_test_runner(mut self, command: CommandSpec) -> Self {
        self.test_runner = command;
        self
    }

    /// Run both children in `dir` and resolve relative paths against it.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// File the emulator stdout is captured to.
    pub fn with_stdout_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_log = path.into();
        self
    }

    /// File the emulator stderr is captured to.
    pub fn with_stderr_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr_log = path.into();
        self
    }

    /// Where the runtime config JSON is written.
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Add an emulator whose address must be discovered.
    pub fn with_required_emulator(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required_emulators.contains(&name) {
            self.required_emulators.push(name);
        }
        self
    }

    /// Replace the whole set of required emulators.
    pub fn with_required_emulators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_emulators = names.into_iter().map(Into::into).collect();
        self
    }

    /// Polling behaviour while reading the emulator log.
    pub fn with_tail(mut self, tail: TailConfig) -> Self {
        self.tail = tail;
        self
    }

    /// Overall bound on finding every required address.
    pub fn with_address_timeout(mut self, timeout: Duration) -> Self {
        self.address_timeout = timeout;
        self
    }

    /// Kill the test suite once it runs longer than `timeout`.
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Interval between exit checks while waiting on a child.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Time the emulators get between SIGTERM and SIGKILL.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Resolve `path` against the working directory when it is relative.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.working_directory {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
