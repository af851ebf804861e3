//! List task: run children in order, return the last status.

use crate::interp::task::{Task, TaskImpl};
use crate::interp::{Context, TaskStatus};

struct TaskList {
    /// Children with their errexit exemption (`!` pipelines).
    children: Vec<(Task, bool)>,
    current: usize,
    last_status: i32,
}

pub(crate) fn task_list(children: Vec<(Task, bool)>) -> Task {
    Task::new(Box::new(TaskList { children, current: 0, last_status: 0 }))
}

impl TaskImpl for TaskList {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        while self.current < self.children.len() {
            if let Some(code) = ctx.state.exit {
                // `exit` or errexit planned a shell exit; stop running.
                return TaskStatus::Exit(code);
            }

            let (child, exempt) = &mut self.children[self.current];
            let exempt = *exempt;

            let ret = child.poll(ctx);
            match ret {
                TaskStatus::Wait
                | TaskStatus::Error
                | TaskStatus::Stopped
                | TaskStatus::Interrupted => return ret,
                TaskStatus::Exit(status) => {
                    self.last_status = status;
                    ctx.state.last_status = status;
                    if status != 0
                        && ctx.state.options.errexit
                        && ctx.state.condition_depth == 0
                        && !exempt
                    {
                        ctx.state.exit = Some(status);
                        return TaskStatus::Exit(status);
                    }
                }
            }

            self.current += 1;
        }

        TaskStatus::Exit(self.last_status)
    }
}
