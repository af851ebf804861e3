//! Loop task for `while` and `until`: run the condition, then the body while
//! the predicate holds. The tasks are rebuilt from the AST on each
//! iteration. `break` and `continue` arrive as `Interrupted` with the branch
//! recorded in the current call frame.

use crate::ast::{CommandList, LoopKind};
use crate::interp::task::{task_for_command_list_array, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};
use crate::shell::Branch;

struct TaskLoopClause {
    condition_ast: Vec<CommandList>,
    body_ast: Vec<CommandList>,
    until: bool,
    condition: Option<Task>,
    body: Task,
    last_body_status: i32,
    /// Whether this loop has bumped the frame's loop depth.
    registered: bool,
}

pub(crate) fn task_loop_clause(lc: &crate::ast::LoopClause) -> Task {
    Task::new(Box::new(TaskLoopClause {
        condition_ast: lc.condition.clone(),
        body_ast: lc.body.clone(),
        until: lc.kind == LoopKind::Until,
        condition: Some(task_for_command_list_array(&lc.condition)),
        body: task_for_command_list_array(&lc.body),
        last_body_status: 0,
        registered: false,
    }))
}

/// Consume a pending break/continue aimed at this loop.
/// Returns the loop's resolution: finish, next iteration, or propagate.
pub(crate) enum BranchResolution {
    Finish,
    NextIteration,
    Propagate,
}

pub(crate) fn resolve_branch(ctx: &mut Context) -> BranchResolution {
    let frame = ctx.state.frame_mut();
    match frame.branch {
        Branch::Break(n) => {
            if n > 1 {
                frame.branch = Branch::Break(n - 1);
                BranchResolution::Propagate
            } else {
                frame.branch = Branch::None;
                BranchResolution::Finish
            }
        }
        Branch::Continue(n) => {
            if n > 1 {
                frame.branch = Branch::Continue(n - 1);
                BranchResolution::Propagate
            } else {
                frame.branch = Branch::None;
                BranchResolution::NextIteration
            }
        }
        // `return` unwinds through every loop up to the function boundary.
        _ => BranchResolution::Propagate,
    }
}

impl TaskLoopClause {
    fn poll_inner(&mut self, ctx: &mut Context) -> TaskStatus {
        loop {
            if let Some(code) = ctx.state.exit {
                return TaskStatus::Exit(code);
            }

            if let Some(condition) = &mut self.condition {
                ctx.state.condition_depth += 1;
                let ret = condition.poll(ctx);
                ctx.state.condition_depth -= 1;
                match ret {
                    TaskStatus::Exit(code) => {
                        let finished =
                            if self.until { code == 0 } else { code != 0 };
                        if finished {
                            return TaskStatus::Exit(self.last_body_status);
                        }
                        self.condition = None;
                    }
                    TaskStatus::Interrupted => match resolve_branch(ctx) {
                        BranchResolution::Finish => {
                            return TaskStatus::Exit(self.last_body_status)
                        }
                        BranchResolution::NextIteration => {
                            self.condition =
                                Some(task_for_command_list_array(&self.condition_ast));
                            continue;
                        }
                        BranchResolution::Propagate => return TaskStatus::Interrupted,
                    },
                    other => return other,
                }
            }

            let ret = self.body.poll(ctx);
            match ret {
                TaskStatus::Exit(status) => {
                    self.last_body_status = status;
                }
                TaskStatus::Interrupted => match resolve_branch(ctx) {
                    BranchResolution::Finish => {
                        return TaskStatus::Exit(self.last_body_status)
                    }
                    BranchResolution::NextIteration => {}
                    BranchResolution::Propagate => return TaskStatus::Interrupted,
                },
                other => return other,
            }

            self.condition = Some(task_for_command_list_array(&self.condition_ast));
            self.body = task_for_command_list_array(&self.body_ast);
        }
    }
}

impl TaskImpl for TaskLoopClause {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if !self.registered {
            ctx.state.frame_mut().nloops += 1;
            self.registered = true;
        }

        let ret = self.poll_inner(ctx);
        if ret != TaskStatus::Wait {
            ctx.state.frame_mut().nloops -= 1;
        }
        ret
    }
}
