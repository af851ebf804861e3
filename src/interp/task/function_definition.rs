//! Function-definition task: deep-copy the body into the function table.

use crate::ast::FunctionDefinition;
use crate::interp::task::{Task, TaskImpl};
use crate::interp::{Context, TaskStatus};
use crate::shell::Function;

struct TaskFunctionDefinition {
    name: String,
    body: crate::ast::Command,
}

pub(crate) fn task_function_definition(fd: &FunctionDefinition) -> Task {
    Task::new(Box::new(TaskFunctionDefinition {
        name: fd.name.clone(),
        body: (*fd.body).clone(),
    }))
}

impl TaskImpl for TaskFunctionDefinition {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        ctx.state
            .functions
            .insert(self.name.clone(), Function { body: self.body.clone() });
        TaskStatus::Exit(0)
    }
}
