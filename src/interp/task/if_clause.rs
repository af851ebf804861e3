//! If-clause task: run the condition, then the body on success or the else
//! part (itself a command, recursively encoding `elif`) on failure.

use crate::ast::IfClause;
use crate::interp::task::{task_for_command, task_for_command_list_array, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};

struct TaskIfClause {
    condition: Task,
    body: Task,
    else_part: Option<Task>,
    /// Set once the condition has finished: true selects the body.
    selected: Option<bool>,
}

pub(crate) fn task_if_clause(ic: &IfClause) -> Task {
    Task::new(Box::new(TaskIfClause {
        condition: task_for_command_list_array(&ic.condition),
        body: task_for_command_list_array(&ic.body),
        else_part: ic.else_part.as_deref().map(task_for_command),
        selected: None,
    }))
}

impl TaskImpl for TaskIfClause {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if self.selected.is_none() {
            ctx.state.condition_depth += 1;
            let ret = self.condition.poll(ctx);
            ctx.state.condition_depth -= 1;
            match ret {
                TaskStatus::Exit(code) => self.selected = Some(code == 0),
                other => return other,
            }
        }

        match self.selected {
            Some(true) => self.body.poll(ctx),
            Some(false) => match &mut self.else_part {
                Some(else_part) => else_part.poll(ctx),
                None => TaskStatus::Exit(0),
            },
            None => unreachable!(),
        }
    }
}
