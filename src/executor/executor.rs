use std::fmt;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use thiserror::Error;
use crate::ast::Pipeline;
use super::jobs::BackgroundJob;

pub type ExecStatus = Result<LaunchReport, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("fork failed: {0}")]
    Fork(Errno),
    #[error("pipe failed: {0}")]
    Pipe(Errno),
    #[error("waiting for process {0} failed: {1}")]
    Wait(Pid, Errno),
    #[error("argument contains a NUL byte: {0:?}")]
    NulByte(String),
    #[error("empty command")]
    EmptyCommand,
}

/// How a child ended, as reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Code(i32),
    Signal(Signal),
}

impl ExitState {
    /// `None` for stop/continue notifications, which are not terminal.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ExitState::Code(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ExitState::Signal(signal)),
            _ => None,
        }
    }

    /// Shell-style status: the exit code, or 128 plus the signal number.
    pub fn code(&self) -> i32 {
        match self {
            ExitState::Code(code) => *code,
            ExitState::Signal(signal) => 128 + *signal as i32,
        }
    }

    pub fn success(&self) -> bool {
        *self == ExitState::Code(0)
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Code(code) => write!(f, "{}", code),
            ExitState::Signal(signal) => write!(f, "{} ({})", self.code(), signal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: Pid,
    pub state: ExitState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchReport {
    /// Every child was waited for, in launch order.
    Foreground(Vec<ChildExit>),
    /// Children left running, in launch order.
    Background(Vec<Pid>),
}

pub trait Executor {
    fn exec(&mut self, pipeline: &Pipeline) -> ExecStatus;

    /// Collects background children that have finished since the last call.
    fn sweep_background(&mut self) -> Vec<BackgroundJob> {
        Vec::new()
    }
}
