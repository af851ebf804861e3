//! `break` and `continue`: unwind enclosing loops via the interrupted
//! status and the call frame's branch field.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::Branch;

fn parse_levels(ctx: &mut Context, argv: &[String], usage: &str) -> Result<u32, TaskStatus> {
    if argv.len() > 2 {
        return Err(usage_error(ctx, usage));
    }
    match argv.get(1) {
        None => Ok(1),
        Some(arg) => match arg.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(usage_error(ctx, usage)),
        },
    }
}

fn branch_builtin(
    ctx: &mut Context,
    argv: &[String],
    usage: &str,
    make: fn(u32) -> Branch,
) -> TaskStatus {
    let levels = match parse_levels(ctx, argv, usage) {
        Ok(levels) => levels,
        Err(status) => return status,
    };

    let frame = ctx.state.frame_mut();
    if frame.nloops == 0 {
        eprintln!("{}: {}: not in a loop", ctx.state.name(), argv[0]);
        return TaskStatus::Exit(0);
    }

    // More levels than enclosing loops behaves like breaking the
    // outermost one.
    let frame = ctx.state.frame_mut();
    frame.branch = make(levels.min(frame.nloops));
    TaskStatus::Interrupted
}

pub fn builtin_break(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    branch_builtin(ctx, argv, "break [n]", Branch::Break)
}

pub fn builtin_continue(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    branch_builtin(ctx, argv, "continue [n]", Branch::Continue)
}
