//! Pipeline task: start every stage left to right before waiting on any,
//! then report the last stage's status (`!` inverts it).
//!
//! The pipeline owns the job its stages join and builds the pipe chain; the
//! forks happen inside the stage tasks. Stages other than a simple command
//! run in a subshell, as every stage owns its own copy of the pipe ends.

use crate::ast::{Command, Node, Pipeline};
use crate::interp::task::{
    simple_command, subshell, task_for_command, Task, TaskImpl,
};
use crate::interp::{Context, TaskStatus};
use crate::shell::os;

struct TaskPipeline {
    children: Vec<Task>,
    bang: bool,
    /// AST copy handed to the job for display.
    node: Node,
    job_id: Option<i32>,
    started: bool,
}

pub(crate) fn task_pipeline(pl: &Pipeline) -> Task {
    let multi_stage = pl.commands.len() > 1;
    let children = pl
        .commands
        .iter()
        .map(|cmd| match cmd {
            Command::Simple(sc) => simple_command::task_simple_command(sc),
            other if multi_stage => {
                // Compound stages run in a subshell so the parent never
                // holds a stage's pipe ends open.
                subshell::task_subshell(task_for_command(other))
            }
            other => task_for_command(other),
        })
        .collect();

    Task::new(Box::new(TaskPipeline {
        children,
        bang: pl.bang,
        node: Node::Pipeline(pl.clone()),
        job_id: None,
        started: false,
    }))
}

impl TaskPipeline {
    fn start(&mut self, ctx: &mut Context) -> Result<(), TaskStatus> {
        if ctx.job.is_none() {
            self.job_id = Some(ctx.state.job_create(&self.node));
        } else {
            self.job_id = ctx.job;
        }

        let count = self.children.len();
        let mut last_stdout = -1;
        for (i, child) in self.children.iter_mut().enumerate() {
            let stdin_fileno = if i > 0 { last_stdout } else { ctx.stdin_fileno };
            let stdout_fileno = if i + 1 < count {
                let (read_end, write_end) = match os::pipe() {
                    Ok(fds) => fds,
                    Err(err) => {
                        eprintln!("{}: pipe: {}", ctx.state.name(), err);
                        return Err(TaskStatus::Error);
                    }
                };
                last_stdout = read_end;
                write_end
            } else {
                ctx.stdout_fileno
            };

            let mut child_ctx = ctx.child(stdin_fileno, stdout_fileno);
            child_ctx.job = self.job_id;
            let ret = child.poll(&mut child_ctx);
            if ret == TaskStatus::Error {
                return Err(TaskStatus::Error);
            }
        }

        Ok(())
    }
}

impl TaskImpl for TaskPipeline {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if self.bang {
            ctx.state.condition_depth += 1;
        }
        let ret = self.poll_inner(ctx);
        if self.bang {
            ctx.state.condition_depth -= 1;
        }

        match ret {
            TaskStatus::Exit(code) if self.bang => {
                TaskStatus::Exit(if code == 0 { 1 } else { 0 })
            }
            other => other,
        }
    }
}

impl TaskPipeline {
    fn poll_inner(&mut self, ctx: &mut Context) -> TaskStatus {
        if !self.started {
            if let Err(status) = self.start(ctx) {
                return status;
            }
            self.started = true;
        }

        let mut ret = TaskStatus::Exit(0);
        for child in &mut self.children {
            let mut child_ctx = ctx.child(-1, -1);
            child_ctx.job = self.job_id;
            ret = child.poll(&mut child_ctx);
            if !matches!(ret, TaskStatus::Exit(_)) {
                return ret;
            }
        }

        ret
    }
}
