//! Subshell task: fork, run the subtask in the child, exit with its status.
//!
//! `fork_subshell` is the shared fork path for every forked shell: it joins
//! the job's process group, resets inherited traps and pending signals,
//! marks the child as a child shell, and installs the pipe ends the context
//! carries. The parent closes those ends.

use std::io;

use crate::interp::task::{task_run, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};
use crate::shell::os;
use crate::shell::{job, trap};

/// Fork a child shell. Returns 0 in the child, the child's pid in the
/// parent. Process registration is left to the caller.
pub fn fork_subshell(ctx: &mut Context) -> io::Result<os::pid_t> {
    let pid = os::fork()?;

    if pid == 0 {
        let state = &mut *ctx.state;

        // Join the job's process group and take the terminal if we are the
        // foreground. Both parent and child do this; the race is benign.
        if state.options.monitor {
            if let Some(job_id) = ctx.job {
                if let Some(job) = state.jobs.iter_mut().find(|j| j.job_id == job_id) {
                    if job.pgid <= 0 {
                        job.pgid = os::getpid();
                    }
                    let pgid = job.pgid;
                    let _ = os::setpgid(0, pgid);
                    if state.job_control
                        && state.interactive
                        && !ctx.background
                        && state.term_fd >= 0
                    {
                        let _ = os::tcsetpgrp(state.term_fd, pgid);
                    }
                }
            }
        }

        job::init_job_child_process(state);
        trap::reset_caught_traps(state);
        trap::clear_pending_signals();

        // A child shell only sees its own children and never touches the
        // terminal.
        state.child = true;
        state.job_control = false;
        state.foreground_job = None;
        state.interactive = false;

        if ctx.stdin_fileno >= 0 {
            let _ = os::dup2(ctx.stdin_fileno, 0);
            if ctx.stdin_fileno != 0 {
                os::close(ctx.stdin_fileno);
            }
            ctx.stdin_fileno = -1;
        }
        if ctx.stdout_fileno >= 0 {
            let _ = os::dup2(ctx.stdout_fileno, 1);
            if ctx.stdout_fileno != 1 {
                os::close(ctx.stdout_fileno);
            }
            ctx.stdout_fileno = -1;
        }

        return Ok(0);
    }

    if ctx.stdin_fileno >= 0 {
        os::close(ctx.stdin_fileno);
        ctx.stdin_fileno = -1;
    }
    if ctx.stdout_fileno >= 0 {
        os::close(ctx.stdout_fileno);
        ctx.stdout_fileno = -1;
    }

    Ok(pid)
}

/// The exit code a forked shell reports for a finished subtask.
pub(crate) fn subshell_exit_code(state: &crate::shell::ShellState, ret: TaskStatus) -> i32 {
    if let Some(code) = state.exit {
        return code;
    }
    match ret {
        TaskStatus::Exit(code) => code,
        TaskStatus::Stopped => 148,
        TaskStatus::Interrupted => state.last_status,
        TaskStatus::Error => 127,
        TaskStatus::Wait => unreachable!("subshell finished in WAIT"),
    }
}

struct TaskSubshell {
    subtask: Option<Task>,
    pid: os::pid_t,
    started: bool,
}

pub(crate) fn task_subshell(subtask: Task) -> Task {
    Task::new(Box::new(TaskSubshell { subtask: Some(subtask), pid: -1, started: false }))
}

impl TaskSubshell {
    fn start(&mut self, ctx: &mut Context) -> bool {
        let pid = match fork_subshell(ctx) {
            Ok(pid) => pid,
            Err(err) => {
                eprintln!("{}: fork: {}", ctx.state.name(), err);
                return false;
            }
        };

        if pid == 0 {
            let mut subtask = self.subtask.take().expect("subshell started twice");
            let ret = {
                let mut child_ctx = ctx.child(-1, -1);
                child_ctx.job = None;
                child_ctx.background = false;
                task_run(&mut subtask, &mut child_ctx)
            };
            trap::run_exit_trap(ctx.state);
            os::flush_stdio();
            std::process::exit(subshell_exit_code(ctx.state, ret));
        }

        self.pid = pid;
        match ctx.job {
            Some(job_id) => {
                ctx.state.job_add_process(job_id, pid);
                if ctx.state.options.monitor
                    && ctx.state.interactive
                    && !ctx.background
                {
                    ctx.state.job_set_foreground(job_id, true, false);
                }
            }
            None => ctx.state.process_create(pid),
        }
        true
    }
}

impl TaskImpl for TaskSubshell {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if !self.started {
            if !self.start(ctx) {
                return TaskStatus::Error;
            }
            self.started = true;
        }

        ctx.state.process_poll(self.pid)
    }
}
