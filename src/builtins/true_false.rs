//! `true` and `false`.

use crate::interp::{Context, TaskStatus};

pub fn builtin_true(_ctx: &mut Context, _argv: &[String]) -> TaskStatus {
    TaskStatus::Exit(0)
}

pub fn builtin_false(_ctx: &mut Context, _argv: &[String]) -> TaskStatus {
    TaskStatus::Exit(1)
}
