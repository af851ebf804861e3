//! Word task: drive the expansion engine on a word it owns. After the task
//! finishes the tree contains only strings and quoted lists. Used where a
//! standalone word must be expanded outside a simple command, such as
//! prompt and `$ENV` expansion.

use crate::ast::Word;
use crate::interp::expansion::{self, TildeMode};
use crate::interp::task::TaskImpl;
use crate::interp::{Context, TaskStatus};

pub struct TaskWord {
    word: Word,
    tilde: TildeMode,
}

impl TaskWord {
    pub fn new(word: Word, tilde: TildeMode) -> TaskWord {
        TaskWord { word, tilde }
    }

    /// The expanded word. Only meaningful after a successful poll.
    pub fn into_word(self) -> Word {
        self.word
    }
}

impl TaskImpl for TaskWord {
    fn poll(&mut self, ctx: &mut Context) -> TaskStatus {
        if self.tilde != TildeMode::None {
            expansion::tilde::expand_tilde(
                ctx.state,
                &mut self.word,
                self.tilde == TildeMode::Assignment,
            );
        }
        if let Err(status) = expansion::run_word(ctx, &mut self.word, false) {
            return status;
        }
        TaskStatus::Exit(0)
    }
}
