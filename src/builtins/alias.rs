//! `alias` and `unalias`: the alias map consulted by the parser at
//! command-word positions.

use crate::builtins::export::escaped;
use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};

pub fn builtin_alias(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() == 1 {
        for (name, value) in &ctx.state.aliases {
            println!("{}={}", name, escaped(value));
        }
        return TaskStatus::Exit(0);
    }

    let mut status = 0;
    for operand in &argv[1..] {
        match operand.split_once('=') {
            Some((name, value)) => {
                ctx.state.aliases.insert(name.to_string(), value.to_string());
            }
            None => match ctx.state.aliases.get(operand) {
                Some(value) => println!("{}={}", operand, escaped(value)),
                None => {
                    eprintln!("{}: alias: {}: not found", ctx.state.name(), operand);
                    status = 1;
                }
            },
        }
    }
    TaskStatus::Exit(status)
}

pub fn builtin_unalias(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() == 1 {
        return usage_error(ctx, "unalias [-a] name...");
    }

    if argv[1] == "-a" {
        ctx.state.aliases.clear();
        return TaskStatus::Exit(0);
    }

    let mut status = 0;
    for name in &argv[1..] {
        if ctx.state.aliases.shift_remove(name).is_none() {
            eprintln!("{}: unalias: {}: not found", ctx.state.name(), name);
            status = 1;
        }
    }
    TaskStatus::Exit(status)
}
