use std::ffi::CString;
use std::ptr;
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{close, fork, pipe2, ForkResult, Pid};
use tracing::{debug, info, warn};
use crate::ast::{Command, OutputMode, Pipeline};
use super::executor::{ChildExit, ExecError, ExecStatus, Executor, ExitState, LaunchReport};
use super::jobs::{BackgroundJob, JobTable};
use super::redirect::Endpoint;

/// Exit status of a child whose redirection could not be set up.
pub const REDIRECT_FAILURE_STATUS: i32 = 125;
/// Exit status of a child whose `execv` failed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// Runs pipelines as real child processes.
#[derive(Debug)]
pub struct DefaultExecutor {
    jobs: JobTable,
}

impl Default for DefaultExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultExecutor {
    /// Puts `SIGCHLD` back to its default disposition. An ignored `SIGCHLD`
    /// inherited from the parent makes the kernel reap children on its own,
    /// and `waitpid` can then no longer report their status.
    pub fn new() -> Self {
        // SAFETY: installs the default disposition, no handler code runs
        if let Err(errno) = unsafe { signal(Signal::SIGCHLD, SigHandler::SigDfl) } {
            warn!(%errno, "cannot reset SIGCHLD disposition");
        }
        DefaultExecutor { jobs: JobTable::new() }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    fn spawn_single(&mut self, cmd: &Prepared) -> Result<Vec<Pid>, ExecError> {
        let pid = fork_child(cmd, cmd.stdin(), cmd.stdout(), &[])?;
        debug!(%pid, argv = ?cmd.argv, "spawned");
        Ok(vec![pid])
    }

    fn spawn_piped(&mut self, left: &Prepared, right: &Prepared) -> Result<Vec<Pid>, ExecError> {
        if left.output.is_some() {
            warn!("output redirection of the left command is ignored, its stdout is the pipe");
        }
        if right.input.is_some() {
            warn!("input redirection of the right command is ignored, its stdin is the pipe");
        }

        let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?;
        let spare = [read_end.as_raw_fd(), write_end.as_raw_fd()];

        let writer = fork_child(left, left.stdin(), Endpoint::Pipe(write_end.as_fd()), &spare)?;
        let reader = match fork_child(right, Endpoint::Pipe(read_end.as_fd()), right.stdout(), &spare) {
            Ok(pid) => pid,
            Err(err) => {
                drop(read_end);
                drop(write_end);
                // The writer is already running; let the sweeps collect it
                self.jobs.register(writer);
                return Err(err);
            }
        };

        // Both children hold their copies now
        drop(read_end);
        drop(write_end);
        debug!(%writer, %reader, "spawned pipe");
        Ok(vec![writer, reader])
    }
}

impl Executor for DefaultExecutor {
    fn exec(&mut self, pipeline: &Pipeline) -> ExecStatus {
        let left = Prepared::new(&pipeline.left)?;
        let pids = match &pipeline.right {
            None => self.spawn_single(&left)?,
            Some(right) => {
                let right = Prepared::new(right)?;
                self.spawn_piped(&left, &right)?
            }
        };

        if pipeline.background {
            for pid in &pids {
                self.jobs.register(*pid);
            }
            info!(?pids, "running in background");
            return Ok(LaunchReport::Background(pids));
        }

        // Every child gets waited for, even after one wait has failed
        let mut finished = Vec::with_capacity(pids.len());
        let mut failure = None;
        for pid in pids {
            match wait_for(pid) {
                Ok(state) => {
                    debug!(%pid, status = %state, "finished");
                    finished.push(ChildExit { pid, state });
                }
                Err(err) => {
                    warn!(%err, "lost track of a foreground child");
                    failure.get_or_insert(err);
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(LaunchReport::Foreground(finished)),
        }
    }

    fn sweep_background(&mut self) -> Vec<BackgroundJob> {
        self.jobs.sweep()
    }
}

/// A command converted to C strings ahead of `fork`, down to the
/// NULL-terminated pointer array `execv` takes.
#[derive(Debug)]
struct Prepared {
    path: CString,
    argv: Vec<CString>,
    // Points into `argv`; the heap buffers stay put while `argv` lives
    argv_ptrs: Vec<*const libc::c_char>,
    input: Option<CString>,
    output: Option<(CString, OutputMode)>,
}

impl Prepared {
    fn new(cmd: &Command) -> Result<Self, ExecError> {
        let argv = cmd
            .argv
            .iter()
            .map(|arg| c_string(arg.as_bytes(), arg))
            .collect::<Result<Vec<_>, _>>()?;
        let path = argv
            .first()
            .cloned()
            .ok_or(ExecError::EmptyCommand)?;
        let input = cmd.input.as_deref().map(c_path).transpose()?;
        let output = cmd
            .output
            .as_ref()
            .map(|redirect| c_path(&redirect.path).map(|path| (path, redirect.mode)))
            .transpose()?;
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        Ok(Prepared { path, argv, argv_ptrs, input, output })
    }

    fn stdin(&self) -> Endpoint<'_> {
        self.input.as_deref().map_or(Endpoint::Inherit, Endpoint::ReadFile)
    }

    fn stdout(&self) -> Endpoint<'_> {
        self.output
            .as_ref()
            .map_or(Endpoint::Inherit, |(path, mode)| Endpoint::WriteFile(path, *mode))
    }
}

fn c_string(bytes: &[u8], shown: &str) -> Result<CString, ExecError> {
    CString::new(bytes).map_err(|_| ExecError::NulByte(shown.to_string()))
}

fn c_path(path: &Path) -> Result<CString, ExecError> {
    c_string(path.as_os_str().as_bytes(), &path.to_string_lossy())
}

fn fork_child(
    cmd: &Prepared,
    stdin: Endpoint<'_>,
    stdout: Endpoint<'_>,
    spare: &[RawFd],
) -> Result<Pid, ExecError> {
    // SAFETY: the child neither allocates nor locks; it only makes
    // async-signal-safe calls on buffers built before the fork until it
    // execs or exits.
    match unsafe { fork() }.map_err(ExecError::Fork)? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => run_child(cmd, stdin, stdout, spare),
    }
}

fn run_child(cmd: &Prepared, stdin: Endpoint<'_>, stdout: Endpoint<'_>, spare: &[RawFd]) -> ! {
    if let Err(errno) = stdout.attach(libc::STDOUT_FILENO) {
        child_fail(b"cannot redirect output to ", stdout.describe(), errno, REDIRECT_FAILURE_STATUS);
    }
    if let Err(errno) = stdin.attach(libc::STDIN_FILENO) {
        child_fail(b"cannot redirect input from ", stdin.describe(), errno, REDIRECT_FAILURE_STATUS);
    }
    for &fd in spare {
        // A spare that landed on a standard slot is the slot now
        if fd > libc::STDERR_FILENO {
            let _ = close(fd);
        }
    }

    // SAFETY: both pointers come from `Prepared`, which outlives the call;
    // `argv_ptrs` ends with a null pointer
    unsafe {
        libc::execv(cmd.path.as_ptr(), cmd.argv_ptrs.as_ptr());
    }
    let errno = Errno::last();
    child_fail(b"cannot execute ", cmd.path.to_bytes(), errno, EXEC_FAILURE_STATUS)
}

/// Reports a failure from inside a forked child and ends it. Writes go
/// straight to the stderr descriptor and `_exit` skips every destructor the
/// child inherited from the shell.
fn child_fail(what: &[u8], subject: &[u8], errno: Errno, status: i32) -> ! {
    let parts: [&[u8]; 6] = [b"msh: ", what, subject, b": ", errno.desc().as_bytes(), b"\n"];
    for part in parts {
        // SAFETY: `part` is a valid buffer of `part.len()` bytes
        unsafe {
            libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len());
        }
    }
    // SAFETY: terminates the child without returning into shell code
    unsafe { libc::_exit(status) }
}

fn wait_for(pid: Pid) -> Result<ExitState, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(state) = ExitState::from_wait_status(status) {
                    return Ok(state);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(ExecError::Wait(pid, errno)),
        }
    }
}
