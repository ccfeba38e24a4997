//! Shell executor
//!
//! Runs a user command as a child process and reports how it ended.
//! Commands arrive in one of two shapes:
//! - Token form: program plus arguments, executed directly
//! - String form: one line handed to the host shell (pipes, redirection, globs)
//!
//! A non-zero exit is a normal [`ExecutionResult`]; only failing to run the
//! command at all is an error.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use pm_core::{Config, OutputMode};
use tokio::process::{Child, Command};
use tokio::runtime::{Builder, Runtime};
use tokio::signal::ctrl_c;
use tokio::time::timeout;
use tracing::debug;

use crate::error::PmError;

/// Characters that only mean something to a shell
const SHELL_METACHARACTERS: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '\\', '"', '\'', '*', '?', '[', ']', '#', '~',
    '=', '%',
];

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellRequest {
    /// Program and arguments, no shell interpretation
    Tokens(Vec<String>),
    /// A line for the host shell
    RawLine(String),
}

impl ShellRequest {
    /// Build a request from the arguments following `shell`
    ///
    /// A single argument that needs a shell (whitespace or metacharacters)
    /// becomes a [`ShellRequest::RawLine`]; anything else is token form.
    pub fn from_args(args: &[String]) -> Result<Self, PmError> {
        match args {
            [] => Err(PmError::Usage("shell: missing command to run".to_string())),
            [program, ..] if program.trim().is_empty() => {
                Err(PmError::Usage("shell: command is empty".to_string()))
            }
            [line] if needs_shell(line) => Ok(Self::RawLine(line.clone())),
            tokens => Ok(Self::Tokens(tokens.to_vec())),
        }
    }

    /// Program being run (the shell's target line for string form)
    pub fn program(&self) -> &str {
        match self {
            Self::Tokens(tokens) => tokens.first().map(String::as_str).unwrap_or_default(),
            Self::RawLine(line) => line,
        }
    }
}

impl fmt::Display for ShellRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokens(tokens) => write!(f, "{}", tokens.join(" ")),
            Self::RawLine(line) => write!(f, "{}", line),
        }
    }
}

fn needs_shell(arg: &str) -> bool {
    arg.chars()
        .any(|c| c.is_whitespace() || SHELL_METACHARACTERS.contains(&c))
}

/// Shell used for string-form commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostShell {
    program: String,
    flag: &'static str,
}

impl HostShell {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let is_cmd = Path::new(&program)
            .file_stem()
            .map(|stem| stem.eq_ignore_ascii_case("cmd"))
            .unwrap_or(false);

        Self {
            program,
            flag: if is_cmd { "/C" } else { "-c" },
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn flag(&self) -> &'static str {
        self.flag
    }
}

impl Default for HostShell {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("cmd")
        } else {
            Self::new("sh")
        }
    }
}

/// Outcome of a command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Captured stdout (empty when output is inherited)
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when output is inherited)
    pub stderr: Vec<u8>,
    /// An interrupt (Ctrl-C) arrived while the command ran
    pub interrupted: bool,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    fn from_output(output: Output, interrupted: bool) -> Self {
        Self {
            exit_code: exit_code_of(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
            interrupted,
        }
    }
}

/// Map an exit status to a process exit code
///
/// A child killed by signal N reports 128 + N, as POSIX shells do.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Executes [`ShellRequest`]s one at a time on the calling thread
pub struct ShellExecutor {
    shell: HostShell,
    output: OutputMode,
    timeout: Option<Duration>,
    runtime: Runtime,
}

impl ShellExecutor {
    pub fn new(config: &Config) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        Ok(Self {
            shell: config
                .shell
                .as_deref()
                .map(HostShell::new)
                .unwrap_or_default(),
            output: config.output,
            timeout: config.timeout(),
            runtime,
        })
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Run a command and wait for it to exit
    pub fn execute(&self, request: &ShellRequest) -> Result<ExecutionResult, PmError> {
        self.runtime.block_on(self.run(request))
    }

    async fn run(&self, request: &ShellRequest) -> Result<ExecutionResult, PmError> {
        let mut command = self.command_for(request);
        command.stdin(Stdio::inherit()).kill_on_drop(true);

        match self.output {
            OutputMode::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        // With a timeout the command gets its own process group, so
        // everything it started can be killed together
        #[cfg(unix)]
        if self.timeout.is_some() {
            command.process_group(0);
        }

        debug!(command = %request, output = ?self.output, "spawning");
        let child = command
            .spawn()
            .map_err(|source| spawn_error(request, source))?;
        let group = if cfg!(unix) && self.timeout.is_some() {
            child.id()
        } else {
            None
        };
        let waiting = wait_for_exit(child, group);

        let (output, interrupted) = match self.timeout {
            Some(limit) => match timeout(limit, waiting).await {
                Ok(output) => output,
                Err(_) => {
                    // Dropping the child kills the shell; the group covers the rest
                    if let Some(pgid) = group {
                        signal_group(pgid, GroupSignal::Kill);
                    }
                    debug!(command = %request, secs = limit.as_secs(), "timed out");
                    return Err(PmError::Timeout {
                        command: request.to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => waiting.await,
        }
        .map_err(|source| PmError::Execution {
            command: request.to_string(),
            source,
        })?;

        let result = ExecutionResult::from_output(output, interrupted);
        debug!(
            command = %request,
            exit_code = result.exit_code,
            interrupted,
            "finished"
        );
        Ok(result)
    }

    fn command_for(&self, request: &ShellRequest) -> Command {
        match request {
            ShellRequest::Tokens(tokens) => {
                let mut command = Command::new(request.program());
                command.args(tokens.iter().skip(1));
                command
            }
            ShellRequest::RawLine(line) => {
                let mut command = Command::new(self.shell.program());
                command.arg(self.shell.flag()).arg(line);
                command
            }
        }
    }
}

/// Wait for the child, riding out Ctrl-C
///
/// The terminal delivers SIGINT to the child as well; the child decides
/// whether to exit, and pm reports whatever it does. A child in its own
/// process group does not see the terminal's SIGINT, so it is forwarded.
async fn wait_for_exit(child: Child, group: Option<u32>) -> io::Result<(Output, bool)> {
    let waiting = child.wait_with_output();
    tokio::pin!(waiting);

    let mut interrupted = false;
    let mut listening = true;
    loop {
        tokio::select! {
            output = &mut waiting => return output.map(|output| (output, interrupted)),
            signal = ctrl_c(), if listening => {
                // The handler stays installed, so later interrupts are absorbed too
                listening = false;
                match signal {
                    Ok(()) => {
                        interrupted = true;
                        debug!("interrupted, waiting for command to exit");
                        if let Some(pgid) = group {
                            signal_group(pgid, GroupSignal::Interrupt);
                        }
                    }
                    Err(err) => debug!(%err, "cannot listen for interrupts"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Interrupt,
    Kill,
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: GroupSignal) {
    let signal = match signal {
        GroupSignal::Interrupt => libc::SIGINT,
        GroupSignal::Kill => libc::SIGKILL,
    };

    // SAFETY: killpg takes plain integers and touches no memory
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, signal) };
    if rc != 0 {
        debug!(pgid, signal, err = %io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: u32, _signal: GroupSignal) {}

fn spawn_error(request: &ShellRequest, source: io::Error) -> PmError {
    match request {
        ShellRequest::Tokens(_) if source.kind() == io::ErrorKind::NotFound => {
            PmError::CommandNotFound(request.program().to_string())
        }
        _ => PmError::Execution {
            command: request.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn capturing() -> ShellExecutor {
        let config = Config {
            output: OutputMode::Capture,
            ..Config::default()
        };
        ShellExecutor::new(&config).unwrap()
    }

    #[test]
    fn test_single_plain_word_is_token_form() {
        let request = ShellRequest::from_args(&args(&["false"])).unwrap();
        assert_eq!(request, ShellRequest::Tokens(args(&["false"])));
    }

    #[test]
    fn test_several_arguments_are_token_form() {
        let request = ShellRequest::from_args(&args(&["ls", "-la", "my dir"])).unwrap();
        assert_eq!(request, ShellRequest::Tokens(args(&["ls", "-la", "my dir"])));
    }

    #[test]
    fn test_single_line_with_spaces_is_string_form() {
        let request = ShellRequest::from_args(&args(&["git status"])).unwrap();
        assert_eq!(request, ShellRequest::RawLine("git status".to_string()));
    }

    #[test]
    fn test_single_word_with_metacharacters_is_string_form() {
        for line in ["*.rs", "a|b", "$HOME", "x>y"] {
            let request = ShellRequest::from_args(&args(&[line])).unwrap();
            assert_eq!(request, ShellRequest::RawLine(line.to_string()));
        }
    }

    #[test]
    fn test_missing_or_blank_command_is_usage_error() {
        assert!(ShellRequest::from_args(&[]).unwrap_err().is_usage());
        assert!(ShellRequest::from_args(&args(&["  "])).unwrap_err().is_usage());
    }

    #[test]
    fn test_blank_program_with_arguments_is_usage_error() {
        let err = ShellRequest::from_args(&args(&["", "foo"])).unwrap_err();
        assert!(err.is_usage());
        assert!(ShellRequest::from_args(&args(&[" ", "-la"]))
            .unwrap_err()
            .is_usage());
    }

    #[test]
    fn test_display_shows_attempted_command() {
        let request = ShellRequest::Tokens(args(&["ls", "-la"]));
        assert_eq!(request.to_string(), "ls -la");
        assert_eq!(request.program(), "ls");
    }

    #[test]
    fn test_host_shell_flags() {
        assert_eq!(HostShell::new("/bin/bash").flag(), "-c");
        assert_eq!(HostShell::new("cmd.exe").flag(), "/C");
        assert_eq!(HostShell::new("CMD").flag(), "/C");
    }

    #[cfg(unix)]
    #[test]
    fn test_string_form_runs_through_shell() {
        let result = capturing()
            .execute(&ShellRequest::RawLine("echo hello".to_string()))
            .unwrap();

        assert!(result.succeeded());
        assert_eq!(result.stdout, b"hello\n");
        assert!(result.stderr.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_string_form_supports_pipes_and_redirection() {
        let executor = capturing();

        let piped = executor
            .execute(&ShellRequest::RawLine("printf 'a\\nb\\n' | wc -l".to_string()))
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&piped.stdout).trim(), "2");

        let redirected = executor
            .execute(&ShellRequest::RawLine("echo oops >&2".to_string()))
            .unwrap();
        assert!(redirected.stdout.is_empty());
        assert_eq!(redirected.stderr, b"oops\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_token_form_does_not_interpret_metacharacters() {
        let result = capturing()
            .execute(&ShellRequest::Tokens(args(&["echo", "$HOME", "|", "x"])))
            .unwrap();
        assert_eq!(result.stdout, b"$HOME | x\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_a_result_not_an_error() {
        let executor = capturing();

        let result = executor
            .execute(&ShellRequest::Tokens(args(&["false"])))
            .unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(!result.succeeded());

        let result = executor
            .execute(&ShellRequest::Tokens(args(&["sh", "-c", "exit 7"])))
            .unwrap();
        assert_eq!(result.exit_code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_is_command_not_found() {
        let err = capturing()
            .execute(&ShellRequest::Tokens(args(&["nonexistent-binary-xyz"])))
            .unwrap_err();

        match err {
            PmError::CommandNotFound(name) => assert_eq!(name, "nonexistent-binary-xyz"),
            other => panic!("expected CommandNotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_execution_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();

        let err = capturing()
            .execute(&ShellRequest::Tokens(vec![path.clone()]))
            .unwrap_err();

        match err {
            PmError::Execution { command, .. } => assert_eq!(command, path),
            other => panic!("expected Execution, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_killed_child_reports_signal_exit_code() {
        let result = capturing()
            .execute(&ShellRequest::RawLine("kill -9 $$".to_string()))
            .unwrap();
        assert_eq!(result.exit_code, 128 + 9);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_is_opt_in() {
        let config = Config {
            timeout_secs: Some(1),
            output: OutputMode::Capture,
            ..Config::default()
        };
        let executor = ShellExecutor::new(&config).unwrap();

        let err = executor
            .execute(&ShellRequest::Tokens(args(&["sleep", "10"])))
            .unwrap_err();
        assert!(matches!(err, PmError::Timeout { secs: 1, .. }));

        // Quick commands are unaffected
        let result = executor
            .execute(&ShellRequest::Tokens(args(&["true"])))
            .unwrap();
        assert!(result.succeeded());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late");
        let config = Config {
            timeout_secs: Some(1),
            output: OutputMode::Capture,
            ..Config::default()
        };
        let executor = ShellExecutor::new(&config).unwrap();

        // The nested shell outlives its parent unless the group is killed
        let line = format!("sh -c 'sleep 2; touch {}'; :", marker.display());
        let err = executor.execute(&ShellRequest::RawLine(line)).unwrap_err();
        assert!(matches!(err, PmError::Timeout { .. }));

        std::thread::sleep(Duration::from_secs(2));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_uninterrupted_run_is_not_flagged() {
        let result = capturing()
            .execute(&ShellRequest::Tokens(args(&["true"])))
            .unwrap();
        assert!(!result.interrupted);
    }

    #[cfg(unix)]
    #[test]
    fn test_inherited_output_is_not_captured() {
        let executor = ShellExecutor::new(&Config::default()).unwrap();
        assert_eq!(executor.output_mode(), OutputMode::Inherit);

        let result = executor
            .execute(&ShellRequest::Tokens(args(&["true"])))
            .unwrap();
        assert!(result.stdout.is_empty());
        assert!(result.stderr.is_empty());
    }
}
