//! `shift`: discard the first n positional parameters.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};

pub fn builtin_shift(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() > 2 {
        return usage_error(ctx, "shift [n]");
    }

    let n = match argv.get(1) {
        None => 1,
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) => n,
            Err(_) => return usage_error(ctx, "shift [n]"),
        },
    };

    let count = ctx.state.positional_params().len();
    if n > count {
        eprintln!(
            "{}: shift: can't shift {} parameters, only {} available",
            ctx.state.name(),
            n,
            count
        );
        return TaskStatus::Error;
    }

    let params: Vec<String> = ctx.state.positional_params()[n..].to_vec();
    ctx.state.set_positional_params(params);
    TaskStatus::Exit(0)
}
