use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};
use super::executor::ExitState;

/// Spawned → Running → Reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Spawned,
    Running,
    Reaped(ExitState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundJob {
    pub pid: Pid,
    pub state: JobState,
}

/// Background children that still have to be waited for.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<BackgroundJob>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pid: Pid) {
        debug!(%pid, "background job registered");
        self.jobs.push(BackgroundJob {
            pid,
            state: JobState::Spawned,
        });
    }

    pub fn jobs(&self) -> &[BackgroundJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Polls every job with `WNOHANG`. Finished jobs leave the table and are
    /// returned in the `Reaped` state.
    pub fn sweep(&mut self) -> Vec<BackgroundJob> {
        let mut reaped = Vec::new();
        self.jobs.retain_mut(|job| {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {
                    job.state = JobState::Running;
                    true
                }
                Ok(status) => match ExitState::from_wait_status(status) {
                    Some(exit) => {
                        job.state = JobState::Reaped(exit);
                        debug!(pid = %job.pid, status = %exit, "background job reaped");
                        reaped.push(*job);
                        false
                    }
                    None => {
                        job.state = JobState::Running;
                        true
                    }
                },
                Err(Errno::EINTR) => true,
                Err(errno) => {
                    // Nothing left to wait for under this pid
                    warn!(pid = %job.pid, %errno, "dropping background job");
                    false
                }
            }
        });
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_starts_spawned() {
        let mut table = JobTable::new();
        assert!(table.is_empty());
        table.register(Pid::from_raw(12345));
        assert_eq!(table.len(), 1);
        assert_eq!(table.jobs()[0].state, JobState::Spawned);
    }

    #[test]
    fn test_unknown_pid_is_dropped() {
        let mut table = JobTable::new();
        // Not a child of the test process, so waitpid reports ECHILD
        table.register(Pid::from_raw(i32::MAX));
        assert!(table.sweep().is_empty());
        assert!(table.is_empty());
    }
}
