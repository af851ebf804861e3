//! Assignment task: apply a bare-assignment command to the shell
//! environment. `allexport` promotes every assigned variable to exported.
//! The command's status is that of the last command substitution performed
//! during expansion, or 0.

use crate::ast::Assignment;
use crate::interp::expansion;
use crate::interp::task::{Task, TaskImpl};
use crate::interp::{Context, TaskStatus};
use crate::shell::{VAR_ATTRIB_EXPORT, VAR_ATTRIB_NONE};

struct TaskAssignment {
    assignments: Vec<Assignment>,
}

pub(crate) fn task_assignment(assignments: &[Assignment]) -> Task {
    Task::new(Box::new(TaskAssignment { assignments: assignments.to_vec() }))
}

/// Expand assignment values and apply them to the shell environment.
pub(crate) fn run_assignments(
    ctx: &mut Context,
    assignments: &[Assignment],
) -> TaskStatus {
    for assign in assignments {
        let mut value = assign.value.clone();
        expansion::tilde::expand_tilde(ctx.state, &mut value, true);
        if let Err(status) = expansion::run_word(ctx, &mut value, false) {
            return status;
        }
        let value = value.str();

        let attribs = if ctx.state.options.allexport {
            VAR_ATTRIB_EXPORT
        } else {
            VAR_ATTRIB_NONE
        };
        if ctx.state.env_set(&assign.name, &value, attribs).is_err() {
            eprintln!(
                "{}: cannot modify readonly variable {}",
                ctx.state.name(),
                assign.name
            );
            return TaskStatus::Error;
        }
    }

    TaskStatus::Exit(0)
}

impl TaskImpl for TaskAssignment {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        ctx.last_cmdsubst_status = None;
        match run_assignments(ctx, &self.assignments) {
            TaskStatus::Exit(_) => {
                TaskStatus::Exit(ctx.last_cmdsubst_status.unwrap_or(0))
            }
            other => other,
        }
    }
}
