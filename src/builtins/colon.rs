//! `:` - the null utility.

use crate::interp::{Context, TaskStatus};

pub fn builtin_colon(_ctx: &mut Context, _argv: &[String]) -> TaskStatus {
    TaskStatus::Exit(0)
}
