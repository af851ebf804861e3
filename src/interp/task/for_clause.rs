//! For-clause task: expand the word list, assign each resulting field to the
//! loop variable, and run the body per iteration. Without an `in` clause the
//! loop iterates over the positional parameters.

use std::collections::VecDeque;

use crate::ast::{CommandList, ForClause, Word};
use crate::interp::expansion::{self, TildeMode};
use crate::interp::task::loop_clause::{resolve_branch, BranchResolution};
use crate::interp::task::{task_for_command_list_array, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};

struct TaskForClause {
    name: String,
    in_word: bool,
    word_list: Vec<Word>,
    body_ast: Vec<CommandList>,
    values: Option<VecDeque<String>>,
    body: Option<Task>,
    last_body_status: i32,
    registered: bool,
}

pub(crate) fn task_for_clause(fc: &ForClause) -> Task {
    Task::new(Box::new(TaskForClause {
        name: fc.name.clone(),
        in_word: fc.in_word,
        word_list: fc.word_list.clone(),
        body_ast: fc.body.clone(),
        values: None,
        body: None,
        last_body_status: 0,
        registered: false,
    }))
}

impl TaskForClause {
    fn expand_values(&mut self, ctx: &mut Context) -> Result<(), TaskStatus> {
        let mut values = VecDeque::new();
        if self.in_word {
            for word in &self.word_list {
                let fields = expansion::expand_to_fields(ctx, word, TildeMode::Name)?;
                values.extend(fields);
            }
        } else {
            values.extend(ctx.state.positional_params().iter().cloned());
        }
        self.values = Some(values);
        Ok(())
    }

    fn poll_inner(&mut self, ctx: &mut Context) -> TaskStatus {
        if self.values.is_none() {
            if let Err(status) = self.expand_values(ctx) {
                return status;
            }
        }

        loop {
            if let Some(code) = ctx.state.exit {
                return TaskStatus::Exit(code);
            }

            if self.body.is_none() {
                let value = match self.values.as_mut().unwrap().pop_front() {
                    Some(value) => value,
                    None => return TaskStatus::Exit(self.last_body_status),
                };
                if ctx.state.env_set(&self.name, &value, 0).is_err() {
                    eprintln!(
                        "{}: cannot modify readonly variable {}",
                        ctx.state.name(),
                        self.name
                    );
                    return TaskStatus::Error;
                }
                self.body = Some(task_for_command_list_array(&self.body_ast));
            }

            let ret = self.body.as_mut().unwrap().poll(ctx);
            match ret {
                TaskStatus::Exit(status) => {
                    self.last_body_status = status;
                    self.body = None;
                }
                TaskStatus::Interrupted => {
                    self.body = None;
                    match resolve_branch(ctx) {
                        BranchResolution::Finish => {
                            return TaskStatus::Exit(self.last_body_status)
                        }
                        BranchResolution::NextIteration => {}
                        BranchResolution::Propagate => return TaskStatus::Interrupted,
                    }
                }
                other => return other,
            }
        }
    }
}

impl TaskImpl for TaskForClause {
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
