//! Jobs and Job Control
//!
//! A job is one or more processes grouped under a single process group,
//! managed as a unit for stop/continue and foreground/background transfers.
//! The terminal has exactly one owner at a time; modes are saved and
//! restored at each transfer. Job identifiers follow POSIX §3.204
//! (`%%`, `%+`, `%-`, `%N`, `%prefix`, `%?substr`).

use crate::ast::print::format_node;
use crate::ast::Node;
use crate::interp::TaskStatus;
use crate::shell::os::{self, SignalDisposition};
use crate::shell::state::ShellState;
use crate::shell::trap;

/// Signals ignored by an interactive job-controlling shell and restored to
/// their defaults in children before exec.
const IGNORED_SIGNALS: &[i32] = &[
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGTSTP,
    libc::SIGTTIN,
    libc::SIGTTOU,
];

extern "C" fn noop_handler(_sig: i32) {}

#[derive(Debug, Clone)]
pub struct Job {
    /// Stable identifier, starting at 1.
    pub job_id: i32,
    /// Process group; equals the first process's pid once one is added.
    pub pgid: os::pid_t,
    /// Pids of the member processes, in pipeline order.
    pub processes: Vec<os::pid_t>,
    /// Terminal modes snapshot, restored when the job is resumed in the
    /// foreground.
    pub term_modes: Option<libc::termios>,
    /// Copied AST for display by `jobs` and `%prefix` lookup.
    pub node: Node,
}

impl ShellState {
    /// Put the shell in control of its terminal: move to the foreground,
    /// ignore the interactive signals, take a process group of its own, grab
    /// the terminal and save its default modes.
    pub fn set_job_control(&mut self, enabled: bool) -> bool {
        debug_assert!(self.term_fd >= 0);

        if self.job_control == enabled {
            return true;
        }
        if !enabled {
            return false;
        }

        // Loop until we are in the foreground.
        loop {
            let pgid = os::getpgrp();
            if os::tcgetpgrp(self.term_fd) == pgid {
                break;
            }
            let _ = os::kill(-pgid, libc::SIGTTIN);
        }

        for &sig in IGNORED_SIGNALS {
            if let Err(err) = os::sigaction(sig, SignalDisposition::Ignore, noop_handler) {
                eprintln!("{}: sigaction: {}", self.name(), err);
                return false;
            }
        }

        // Put ourselves in our own process group, unless we are the session
        // leader.
        self.pgid = os::getpid();
        if os::getsid() != self.pgid {
            if let Err(err) = os::setpgid(self.pgid, self.pgid) {
                eprintln!("{}: setpgid: {}", self.name(), err);
                return false;
            }
        }

        if let Err(err) = os::tcsetpgrp(self.term_fd, self.pgid) {
            eprintln!("{}: tcsetpgrp: {}", self.name(), err);
            return false;
        }
        match os::tcgetattr(self.term_fd) {
            Ok(termios) => self.term_modes = Some(termios),
            Err(err) => {
                eprintln!("{}: tcgetattr: {}", self.name(), err);
                return false;
            }
        }

        self.job_control = true;
        true
    }

    pub fn job_create(&mut self, node: &Node) -> i32 {
        let mut id = 1;
        for job in &self.jobs {
            if id < job.job_id + 1 {
                id = job.job_id + 1;
            }
        }

        self.jobs.push(Job {
            job_id: id,
            pgid: -1,
            processes: Vec::new(),
            term_modes: None,
            node: node.clone(),
        });
        id
    }

    pub fn job_get(&self, job_id: i32) -> Option<&Job> {
        self.jobs.iter().find(|job| job.job_id == job_id)
    }

    fn job_get_mut(&mut self, job_id: i32) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.job_id == job_id)
    }

    pub fn job_destroy(&mut self, job_id: i32) {
        if self.foreground_job == Some(job_id) {
            self.job_set_foreground(job_id, false, false);
        }
        let Some(index) = self.jobs.iter().position(|job| job.job_id == job_id) else {
            return;
        };
        let job = self.jobs.remove(index);
        for pid in job.processes {
            self.process_remove(pid);
        }
    }

    /// Add a process to a job and to its process group. `setpgid` races with
    /// the same call in the child; EPERM after the child execs is benign.
    pub fn job_add_process(&mut self, job_id: i32, pid: os::pid_t) {
        self.process_create(pid);

        let Some(job) = self.job_get_mut(job_id) else {
            return;
        };
        if job.pgid <= 0 {
            job.pgid = pid;
        }
        let pgid = job.pgid;
        job.processes.push(pid);

        // Without job control every child stays in the shell's process
        // group.
        if self.options.monitor {
            if let Err(err) = os::setpgid(pid, pgid) {
                if err.raw_os_error() != Some(libc::EPERM) {
                    eprintln!("{}: setpgid: {}", self.name(), err);
                }
            }
        }
    }

    /// A job's status: WAIT while any process runs, STOPPED when one is
    /// stopped and none runs, otherwise the exit status of the last process
    /// in the pipeline.
    pub fn job_poll(&self, job_id: i32) -> TaskStatus {
        let Some(job) = self.job_get(job_id) else {
            return TaskStatus::Error;
        };

        let mut status = TaskStatus::Exit(0);
        let mut stopped = false;
        for &pid in &job.processes {
            status = self.process_poll(pid);
            if status == TaskStatus::Wait {
                return TaskStatus::Wait;
            }
            if status == TaskStatus::Stopped {
                stopped = true;
            }
        }

        if stopped {
            return TaskStatus::Stopped;
        }
        status
    }

    /// Move a job in or out of the foreground, saving and restoring terminal
    /// modes, optionally continuing a stopped job with SIGCONT.
    pub fn job_set_foreground(&mut self, job_id: i32, foreground: bool, cont: bool) {
        let mut cont = cont;
        if self.job_poll(job_id) != TaskStatus::Stopped {
            cont = false;
        }

        let Some(job) = self.job_get(job_id) else {
            return;
        };
        debug_assert!(job.pgid > 0);
        let pgid = job.pgid;
        let job_term_modes = job.term_modes;

        let on_terminal = self.job_control && self.term_fd >= 0;

        if foreground && self.foreground_job != Some(job_id) {
            debug_assert!(self.foreground_job.is_none());
            if on_terminal {
                let _ = os::tcsetpgrp(self.term_fd, pgid);
                if cont {
                    if let Some(termios) = &job_term_modes {
                        let _ = os::tcsetattr(self.term_fd, termios);
                    }
                }
            }
            self.foreground_job = Some(job_id);
        }

        if !foreground && self.foreground_job == Some(job_id) {
            if on_terminal {
                // Hand the terminal back to the shell, saving the job's
                // modes for a later fg.
                let _ = os::tcsetpgrp(self.term_fd, self.pgid);
                let saved = os::tcgetattr(self.term_fd).ok();
                if let Some(job) = self.job_get_mut(job_id) {
                    job.term_modes = saved;
                }
                if let Some(termios) = self.term_modes {
                    let _ = os::tcsetattr(self.term_fd, &termios);
                }
            }
            self.foreground_job = None;
        }

        if cont {
            if let Err(err) = os::kill(-pgid, libc::SIGCONT) {
                eprintln!("{}: kill: {}", self.name(), err);
                return;
            }
            let pids: Vec<os::pid_t> = self
                .job_get(job_id)
                .map(|job| job.processes.clone())
                .unwrap_or_default();
            for pid in pids {
                if let Some(proc) = self.processes.iter_mut().find(|p| p.pid == pid) {
                    proc.stopped = false;
                }
            }
        }
    }

    /// Block until one specific child changes state. Only the main shell
    /// asks to observe stops; child shells have a partial view of the
    /// process tree and must wait for their own children by pid, so a
    /// grandchild's status is never stolen.
    fn wait_one(&mut self, pid: os::pid_t) -> bool {
        debug_assert!(pid > 0 && pid != os::getpid());
        match os::waitpid(pid, !self.child) {
            Ok((reaped, stat)) => {
                debug_assert!(reaped > 0);
                self.update_job(reaped, stat);
                true
            }
            Err(err) => {
                eprintln!("{}: waitpid: {}", self.name(), err);
                false
            }
        }
    }

    /// Block until any child changes state, in the top-level wait loop.
    pub fn wait_any(&mut self) -> bool {
        if self.child {
            // Partial view: pick one of our own pending children.
            let pid = self
                .processes
                .iter()
                .find(|proc| proc.poll() == TaskStatus::Wait)
                .map(|proc| proc.pid);
            return match pid {
                Some(pid) => self.wait_one(pid),
                None => true,
            };
        }

        match os::waitpid(-1, true) {
            Ok((pid, stat)) => {
                self.update_job(pid, stat);
                true
            }
            Err(err) => {
                if err.raw_os_error() == Some(libc::ECHILD) {
                    return true;
                }
                eprintln!("{}: waitpid: {}", self.name(), err);
                false
            }
        }
    }

    /// Run the wait loop until the job reaches a final or stopped state.
    pub fn job_wait(&mut self, job_id: i32) -> TaskStatus {
        loop {
            let status = self.job_poll(job_id);
            if status != TaskStatus::Wait {
                return status;
            }

            let wait_pid = self
                .job_get(job_id)
                .and_then(|job| {
                    job.processes
                        .iter()
                        .find(|&&pid| self.process_poll(pid) == TaskStatus::Wait)
                        .copied()
                })
                .expect("polled WAIT without a waiting process");
            if !self.wait_one(wait_pid) {
                return TaskStatus::Error;
            }
        }
    }

    /// Run the wait loop until one process reaches a final state.
    pub fn job_wait_process(&mut self, pid: os::pid_t) -> TaskStatus {
        loop {
            let status = self.process_poll(pid);
            if status != TaskStatus::Wait {
                return status;
            }
            if !self.wait_one(pid) {
                return TaskStatus::Error;
            }
        }
    }

    /// Record a reaped status and push newly stopped or finished jobs out of
    /// the foreground. Child shells skip the terminal handling; they only
    /// know about their own processes.
    pub fn update_job(&mut self, pid: os::pid_t, stat: i32) {
        self.update_process(pid, stat);

        if !self.child {
            let ids: Vec<i32> = self.jobs.iter().map(|job| job.job_id).collect();
            for job_id in ids {
                let pgid = self.job_get(job_id).map(|job| job.pgid).unwrap_or(-1);
                if self.job_poll(job_id) != TaskStatus::Wait && pgid > 0 {
                    self.job_set_foreground(job_id, false, false);
                }
            }
        }
    }

    /// Reap jobs whose processes have all terminated, after their status has
    /// been consumed.
    pub fn destroy_finished_jobs(&mut self) {
        let finished: Vec<i32> = self
            .jobs
            .iter()
            .map(|job| job.job_id)
            .filter(|&id| matches!(self.job_poll(id), TaskStatus::Exit(_)))
            .collect();
        for job_id in finished {
            self.job_destroy(job_id);
        }
    }

    /// Resolve a `%` job identifier (POSIX §3.204). Prefix and substring
    /// forms must match a unique job.
    pub fn job_by_id(&self, id: &str) -> Result<i32, String> {
        let bytes = id.as_bytes();
        if bytes.first() != Some(&b'%') || bytes.len() < 2 {
            return Err(format!("invalid job ID specifier '{}'", id));
        }
        let spec = &id[1..];

        if spec == "%" || spec == "+" {
            // Current job: most recently stopped, else most recently
            // started still running.
            for job in self.jobs.iter().rev() {
                if self.job_poll(job.job_id) == TaskStatus::Stopped {
                    return Ok(job.job_id);
                }
            }
            for job in self.jobs.iter().rev() {
                if self.job_poll(job.job_id) == TaskStatus::Wait {
                    return Ok(job.job_id);
                }
            }
            return Err("no current job".to_string());
        }

        if spec == "-" {
            let mut n = 0;
            for job in self.jobs.iter().rev() {
                if self.job_poll(job.job_id) == TaskStatus::Stopped {
                    n += 1;
                    if n == 2 {
                        return Ok(job.job_id);
                    }
                }
            }
            let mut first = true;
            for job in self.jobs.iter().rev() {
                if self.job_poll(job.job_id) == TaskStatus::Wait {
                    if first {
                        first = false;
                        continue;
                    }
                    return Ok(job.job_id);
                }
            }
            return Err("no previous job".to_string());
        }

        if spec.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            let n: i32 = spec
                .parse()
                .map_err(|_| format!("invalid job number '{}'", id))?;
            return match self.jobs.iter().find(|job| job.job_id == n) {
                Some(job) => Ok(job.job_id),
                None => Err(format!("no such job '{}'", id)),
            };
        }

        let (needle, substring) = match spec.strip_prefix('?') {
            Some(needle) => (needle, true),
            None => (spec, false),
        };
        let mut matches = Vec::new();
        for job in &self.jobs {
            let cmd = format_node(&job.node);
            let matched = if substring {
                cmd.contains(needle)
            } else {
                cmd.starts_with(needle)
            };
            if matched {
                matches.push(job.job_id);
            }
        }
        match matches.len() {
            0 => Err(format!("no such job '{}'", id)),
            1 => Ok(matches[0]),
            _ => Err(format!("ambiguous job specifier '{}'", id)),
        }
    }
}

/// Called in a freshly forked child of a job-controlling shell: restore the
/// default dispositions for the interactive signals.
pub fn init_job_child_process(state: &ShellState) -> bool {
    if !state.job_control {
        return true;
    }

    for &sig in IGNORED_SIGNALS {
        if let Err(err) = os::sigaction(sig, SignalDisposition::Default, noop_handler) {
            eprintln!("{}: sigaction: {}", state.name(), err);
            return false;
        }
    }
    trap::clear_pending_signals();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn state() -> ShellState {
        ShellState::new(vec!["test-sh".to_string()])
    }

    fn node_for(src: &str) -> Node {
        parse(src).unwrap().body.remove(0).node
    }

    fn exit_stat(code: i32) -> i32 {
        (code & 0xff) << 8
    }

    fn add_job(state: &mut ShellState, src: &str, pids: &[os::pid_t]) -> i32 {
        let node = node_for(src);
        let job_id = state.job_create(&node);
        for &pid in pids {
            state.process_create(pid);
            let job = state.jobs.iter_mut().find(|j| j.job_id == job_id).unwrap();
            if job.pgid <= 0 {
                job.pgid = pid;
            }
            job.processes.push(pid);
        }
        job_id
    }

    #[test]
    fn test_job_ids_increment() {
        let mut state = state();
        let a = add_job(&mut state, "sleep 1", &[101]);
        let b = add_job(&mut state, "sleep 2", &[102]);
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        state.job_destroy(b);
        let c = add_job(&mut state, "sleep 3", &[103]);
        assert_eq!(c, 2);
    }

    #[test]
    fn test_job_poll_last_process_wins() {
        let mut state = state();
        let id = add_job(&mut state, "a | b", &[201, 202]);
        assert_eq!(state.job_poll(id), TaskStatus::Wait);

        state.update_process(201, exit_stat(1));
        assert_eq!(state.job_poll(id), TaskStatus::Wait);

        state.update_process(202, exit_stat(0));
        assert_eq!(state.job_poll(id), TaskStatus::Exit(0));
    }

    #[test]
    fn test_job_poll_stopped() {
        let mut state = state();
        let id = add_job(&mut state, "cat", &[301]);
        let proc = state.processes.iter_mut().find(|p| p.pid == 301).unwrap();
        proc.stopped = true;
        assert_eq!(state.job_poll(id), TaskStatus::Stopped);
    }

    #[test]
    fn test_job_by_number_and_prefix() {
        let mut state = state();
        add_job(&mut state, "sleep 10", &[401]);
        add_job(&mut state, "cat file", &[402]);

        assert_eq!(state.job_by_id("%1").unwrap(), 1);
        assert_eq!(state.job_by_id("%cat").unwrap(), 2);
        assert_eq!(state.job_by_id("%?file").unwrap(), 2);
        assert!(state.job_by_id("%nosuch").is_err());
        assert!(state.job_by_id("%9").is_err());
        assert!(state.job_by_id("x").is_err());
    }

    #[test]
    fn test_job_prefix_ambiguity_is_error() {
        let mut state = state();
        add_job(&mut state, "sleep 10", &[501]);
        add_job(&mut state, "sleep 20", &[502]);
        assert!(state.job_by_id("%sleep").is_err());
        assert!(state.job_by_id("%?sle").is_err());
    }

    #[test]
    fn test_current_job_prefers_stopped() {
        let mut state = state();
        add_job(&mut state, "first", &[601]);
        let second = add_job(&mut state, "second", &[602]);
        add_job(&mut state, "third", &[603]);

        // All running: the most recent one is current.
        assert_eq!(state.job_by_id("%%").unwrap(), 3);
        assert_eq!(state.job_by_id("%-").unwrap(), second);

        // A stopped job takes precedence.
        let proc = state.processes.iter_mut().find(|p| p.pid == 602).unwrap();
        proc.stopped = true;
        assert_eq!(state.job_by_id("%+").unwrap(), second);
    }

    #[test]
    fn test_destroy_finished_jobs() {
        let mut state = state();
        let id = add_job(&mut state, "true", &[701]);
        state.update_process(701, exit_stat(0));
        state.destroy_finished_jobs();
        assert!(state.job_get(id).is_none());
        assert!(state.process_get(701).is_none());
    }
}
