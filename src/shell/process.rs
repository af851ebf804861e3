//! Process Table
//!
//! A flat view of all live child processes, updated from raw `waitpid`
//! statuses. Jobs reference processes by pid; a process appears in exactly
//! one job.

use crate::interp::TaskStatus;
use crate::shell::os;
use crate::shell::state::ShellState;

#[derive(Debug, Clone)]
pub struct Process {
    pub pid: os::pid_t,
    pub stopped: bool,
    pub terminated: bool,
    /// Raw wait status once terminated.
    pub stat: i32,
    /// The signal that most recently stopped or terminated the process.
    pub last_sig: i32,
}

impl Process {
    /// The task-status view of this process: the exit status once it has
    /// terminated, 128+n for signal deaths.
    pub fn poll(&self) -> TaskStatus {
        if self.stopped {
            return TaskStatus::Stopped;
        }
        if !self.terminated {
            return TaskStatus::Wait;
        }
        if libc::WIFSIGNALED(self.stat) {
            TaskStatus::Exit(128 + libc::WTERMSIG(self.stat))
        } else {
            TaskStatus::Exit(libc::WEXITSTATUS(self.stat))
        }
    }
}

impl ShellState {
    /// Register a freshly forked child.
    pub fn process_create(&mut self, pid: os::pid_t) {
        self.processes.push(Process {
            pid,
            stopped: false,
            terminated: false,
            stat: 0,
            last_sig: 0,
        });
    }

    pub fn process_get(&self, pid: os::pid_t) -> Option<&Process> {
        self.processes.iter().find(|proc| proc.pid == pid)
    }

    pub fn process_poll(&self, pid: os::pid_t) -> TaskStatus {
        match self.process_get(pid) {
            Some(proc) => proc.poll(),
            // Already reaped and dropped; treat as gone.
            None => TaskStatus::Exit(127),
        }
    }

    /// Record a raw status reported by `waitpid` for `pid`. After a pid has
    /// been reported as terminated it is never waited on again.
    pub fn update_process(&mut self, pid: os::pid_t, stat: i32) {
        let Some(proc) = self.processes.iter_mut().find(|proc| proc.pid == pid) else {
            return;
        };
        if libc::WIFSTOPPED(stat) {
            proc.stopped = true;
            proc.last_sig = libc::WSTOPSIG(stat);
        } else {
            proc.terminated = true;
            proc.stat = stat;
            if libc::WIFSIGNALED(stat) {
                proc.last_sig = libc::WTERMSIG(stat);
            }
        }
    }

    pub fn process_remove(&mut self, pid: os::pid_t) {
        self.processes.retain(|proc| proc.pid != pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ShellState {
        ShellState::new(vec!["test-sh".to_string()])
    }

    fn exit_stat(code: i32) -> i32 {
        // The inverse of WEXITSTATUS on every platform we target.
        (code & 0xff) << 8
    }

    #[test]
    fn test_process_lifecycle() {
        let mut state = state();
        state.process_create(100);
        assert_eq!(state.process_poll(100), TaskStatus::Wait);

        state.update_process(100, exit_stat(3));
        assert_eq!(state.process_poll(100), TaskStatus::Exit(3));

        state.process_remove(100);
        assert!(state.process_get(100).is_none());
    }

    #[test]
    fn test_unknown_pid_ignored() {
        let mut state = state();
        state.update_process(42, exit_stat(0));
        assert!(state.process_get(42).is_none());
    }
}
