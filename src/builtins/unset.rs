//! `unset`: remove variables or functions.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};

pub fn builtin_unset(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut functions = false;
    let mut operands = &argv[1..];
    match operands.first().map(|s| s.as_str()) {
        Some("-f") => {
            functions = true;
            operands = &operands[1..];
        }
        Some("-v") => {
            operands = &operands[1..];
        }
        Some(arg) if arg.starts_with('-') && arg != "-" => {
            return usage_error(ctx, "unset [-fv] name...");
        }
        _ => {}
    }

    for name in operands {
        if functions {
            ctx.state.functions.shift_remove(name);
        } else if ctx.state.env_unset(name).is_err() {
            eprintln!(
                "{}: cannot unset readonly variable {}",
                ctx.state.name(),
                name
            );
            return TaskStatus::Error;
        }
    }

    TaskStatus::Exit(0)
}
