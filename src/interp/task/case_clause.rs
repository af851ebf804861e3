//! Case-clause task: expand the subject word, then expand and match pattern
//! words one at a time. The first matching item's body runs; no match is
//! status 0. Matching is glob-style against the subject, not pathname
//! expansion, so quoted pattern characters stay literal.

use crate::ast::{CaseClause, CommandList, Word};
use crate::interp::expansion::{self, pattern, TildeMode};
use crate::interp::task::{task_for_command_list_array, Task, TaskImpl};
use crate::interp::{Context, TaskStatus};

struct CaseItemEntry {
    patterns: Vec<Word>,
    body_ast: Vec<CommandList>,
}

struct TaskCaseClause {
    word: Word,
    items: Vec<CaseItemEntry>,
    subject: Option<String>,
    selected: Option<Task>,
    matched: bool,
}

pub(crate) fn task_case_clause(cc: &CaseClause) -> Task {
    let items = cc
        .items
        .iter()
        .map(|item| CaseItemEntry {
            patterns: item.patterns.clone(),
            body_ast: item.body.clone(),
        })
        .collect();
    Task::new(Box::new(TaskCaseClause {
        word: cc.word.clone(),
        items,
        subject: None,
        selected: None,
        matched: false,
    }))
}

impl TaskImpl for TaskCaseClause {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if self.subject.is_none() {
            match expansion::expand_to_string(ctx, &self.word, TildeMode::Name) {
                Ok(subject) => self.subject = Some(subject),
                Err(status) => return status,
            }
        }

        if !self.matched {
            let subject = self.subject.clone().unwrap();
            'items: for item in &self.items {
                for pattern_word in &item.patterns {
                    let mut expanded = pattern_word.clone();
                    expansion::tilde::expand_tilde(ctx.state, &mut expanded, false);
                    if let Err(status) = expansion::run_word(ctx, &mut expanded, false) {
                        return status;
                    }
                    let pattern_str = pattern::word_to_regex_pattern(&expanded);
                    if pattern::pattern_matches(&pattern_str, &subject) {
                        self.selected =
                            Some(task_for_command_list_array(&item.body_ast));
                        break 'items;
                    }
                }
            }
            self.matched = true;
        }

        match &mut self.selected {
            Some(selected) => selected.poll(ctx),
            None => TaskStatus::Exit(0),
        }
    }
}
