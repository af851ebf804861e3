//! `exit`: plan a shell exit with the given status, or the last command's.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};

pub fn builtin_exit(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() > 2 {
        return usage_error(ctx, "exit [n]");
    }

    let code = match argv.get(1) {
        None => ctx.state.last_status,
        Some(arg) => match arg.parse::<i32>() {
            Ok(code) => code,
            Err(_) => return usage_error(ctx, "exit [n]"),
        },
    };

    ctx.state.exit = Some(code);
    TaskStatus::Exit(code)
}
