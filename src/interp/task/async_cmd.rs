//! Asynchronous (`&`) command task: fork a subshell running the child task,
//! register a new job for it, and return immediately with status 0. When
//! job control is off the child's stdin is redirected to /dev/null.

use crate::ast::Node;
use crate::interp::task::{subshell, task_run, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};
use crate::shell::os;
use crate::shell::trap;

struct TaskAsync {
    child: Option<Task>,
    node: Node,
    started: bool,
}

pub(crate) fn task_async(child: Task, node: &Node) -> Task {
    Task::new(Box::new(TaskAsync { child: Some(child), node: node.clone(), started: false }))
}

impl TaskAsync {
    fn start(&mut self, ctx: &mut Context) -> bool {
        let job_id = ctx.state.job_create(&self.node);

        let pid = {
            let mut fork_ctx = ctx.child(-1, -1);
            fork_ctx.job = Some(job_id);
            fork_ctx.background = true;
            match subshell::fork_subshell(&mut fork_ctx) {
                Ok(pid) => pid,
                Err(err) => {
                    eprintln!("{}: fork: {}", ctx.state.name(), err);
                    return false;
                }
            }
        };

        if pid == 0 {
            if !ctx.state.options.monitor {
                // Without job control an async command must not read the
                // shell's stdin.
                match os::open_dev_null() {
                    Ok(fd) => {
                        let _ = os::dup2(fd, 0);
                        os::close(fd);
                    }
                    Err(err) => {
                        eprintln!("{}: /dev/null: {}", ctx.state.name(), err);
                        std::process::exit(1);
                    }
                }
            }

            let mut child = self.child.take().expect("async task started twice");
            let ret = {
                let mut child_ctx = ctx.child(-1, -1);
                child_ctx.job = None;
                child_ctx.background = false;
                task_run(&mut child, &mut child_ctx)
            };
            trap::run_exit_trap(ctx.state);
            os::flush_stdio();
            std::process::exit(subshell::subshell_exit_code(ctx.state, ret));
        }

        ctx.state.job_add_process(job_id, pid);
        ctx.state.last_bg_pid = pid;
        true
    }
}

impl TaskImpl for TaskAsync {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if !self.started {
            if !self.start(ctx) {
                return TaskStatus::Error;
            }
            self.started = true;
        }

        TaskStatus::Exit(0)
    }
}
