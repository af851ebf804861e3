//! Task Framework
//!
//! A task abstracts one operation the shell performs while walking the AST.
//! `poll` must return without blocking: `Wait` while child processes are
//! pending, a final status otherwise. The final status is cached and `poll`
//! is not called again. Blocking happens only in the driver's `waitpid`
//! loop and the documented suspension points (command substitution reads,
//! the here-document helper, `job_wait_process`).

mod assignment;
mod async_cmd;
mod binop;
mod case_clause;
mod for_clause;
mod function_definition;
mod if_clause;
mod list;
mod loop_clause;
mod pipeline;
mod simple_command;
mod subshell;
mod word;

use crate::ast::{Command, CommandList, Node};
use crate::interp::{Context, TaskStatus};
use crate::shell::trap;

pub use subshell::fork_subshell;
pub use word::TaskWord;

pub(crate) trait TaskImpl {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus;
}

/// A pollable task with its cached final status.
pub struct Task {
    imp: Box<dyn TaskImpl>,
    status: TaskStatus,
}

impl Task {
    pub(crate) fn new(imp: Box<dyn TaskImpl>) -> Task {
        Task { imp, status: TaskStatus::Wait }
    }

    /// Request a status update, starting or continuing the task. Once the
    /// task leaves `Wait` the status sticks.
    pub fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if self.status == TaskStatus::Wait {
            self.status = self.imp.poll(ctx);
        }
        self.status
    }
}

/// Drive a task to completion: poll, run pending traps, and demultiplex
/// child statuses with `waitpid` until the task finishes. This is the only
/// place the main shell blocks.
pub fn task_run(task: &mut Task, ctx: &mut Context) -> TaskStatus {
    loop {
        trap::run_pending_traps(ctx);

        let ret = task.poll(ctx);
        if ret != TaskStatus::Wait {
            if ret != TaskStatus::Error && ret != TaskStatus::Interrupted {
                let status = ret.code();
                ctx.state.last_status = status;
            }

            if let Some(job_id) = ctx.state.foreground_job {
                ctx.state.job_set_foreground(job_id, false, false);
            }
            ctx.state.destroy_finished_jobs();

            return ret;
        }

        ctx.state.destroy_finished_jobs();

        if !ctx.state.wait_any() {
            return TaskStatus::Error;
        }
    }
}

/// Build the task for one and-or list, wrapping asynchronous lists.
fn task_for_command_list(list: &CommandList) -> Task {
    let child = task_for_node(&list.node);
    if list.ampersand {
        async_cmd::task_async(child, &list.node)
    } else {
        child
    }
}

/// A `!` pipeline's own failure never triggers errexit.
fn is_errexit_exempt(node: &Node) -> bool {
    matches!(node, Node::Pipeline(pl) if pl.bang)
}

pub fn task_for_command_list_array(lists: &[CommandList]) -> Task {
    let children = lists
        .iter()
        .map(|list| (task_for_command_list(list), is_errexit_exempt(&list.node)))
        .collect();
    list::task_list(children)
}

pub fn task_for_node(node: &Node) -> Task {
    match node {
        Node::Pipeline(pl) => pipeline::task_pipeline(pl),
        Node::Binop(binop) => binop::task_binop(binop),
    }
}

pub fn task_for_command(cmd: &Command) -> Task {
    match cmd {
        Command::Simple(sc) => simple_command::task_simple_command(sc),
        Command::BraceGroup(bg) => task_for_command_list_array(&bg.body),
        Command::Subshell(s) => {
            subshell::task_subshell(task_for_command_list_array(&s.body))
        }
        Command::If(ic) => if_clause::task_if_clause(ic),
        Command::For(fc) => for_clause::task_for_clause(fc),
        Command::Loop(lc) => loop_clause::task_loop_clause(lc),
        Command::Case(cc) => case_clause::task_case_clause(cc),
        Command::FunctionDefinition(fd) => {
            function_definition::task_function_definition(fd)
        }
    }
}
