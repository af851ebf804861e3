//! `return`: exit from a function or a sourced script.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::Branch;

pub fn builtin_return(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() > 2 {
        return usage_error(ctx, "return [n]");
    }

    let code = match argv.get(1) {
        None => ctx.state.last_status,
        Some(arg) => match arg.parse::<i32>() {
            Ok(code) => code,
            Err(_) => return usage_error(ctx, "return [n]"),
        },
    };

    if ctx.state.frames.len() == 1 && ctx.state.dot_depth == 0 {
        eprintln!(
            "{}: return: can only be used in a function or sourced script",
            ctx.state.name()
        );
        return TaskStatus::Exit(1);
    }

    ctx.state.last_status = code;
    ctx.state.frame_mut().branch = Branch::Return;
    TaskStatus::Interrupted
}
