//! `trap`: install, reset or list signal trap actions.

use crate::interp::{Context, TaskStatus};
use crate::parser::parse;
use crate::shell::trap::{self, signal_from_name, signal_name, TrapAction, NSIG};

fn print_traps(ctx: &Context) {
    for sig in 0..NSIG {
        let slot = &ctx.state.traps[sig];
        if !slot.set {
            continue;
        }
        let action = match slot.action {
            TrapAction::Default => continue,
            TrapAction::Ignore => String::new(),
            TrapAction::Catch => slot.command.clone(),
        };
        println!("trap -- '{}' {}", action.replace('\'', "'\\''"), signal_name(sig as i32));
    }
}

pub fn builtin_trap(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut operands = &argv[1..];
    if operands.first().map(|s| s.as_str()) == Some("--") {
        operands = &operands[1..];
    }

    if operands.is_empty() {
        print_traps(ctx);
        return TaskStatus::Exit(0);
    }

    // When the first operand is an unsigned integer, every operand is a
    // condition to reset.
    let reset_all = operands[0].parse::<u32>().is_ok();
    let (action, conditions) = if reset_all {
        ("-", operands)
    } else {
        (operands[0].as_str(), &operands[1..])
    };

    if conditions.is_empty() {
        eprintln!("{}: usage: trap [action condition...]", ctx.state.name());
        return TaskStatus::Error;
    }

    // Parse the action once; every condition shares the program.
    let (trap_action, program) = match action {
        "-" => (TrapAction::Default, None),
        "" => (TrapAction::Ignore, None),
        _ => match parse(action) {
            Ok(program) => (TrapAction::Catch, Some(program)),
            Err(err) => {
                eprintln!("{}: trap: {}", ctx.state.name(), err);
                return TaskStatus::Error;
            }
        },
    };

    for condition in conditions {
        let Some(sig) = signal_from_name(condition) else {
            eprintln!(
                "{}: trap: {}: invalid condition",
                ctx.state.name(),
                condition
            );
            return TaskStatus::Error;
        };
        if !trap::set_trap(
            ctx.state,
            sig,
            trap_action,
            program.clone(),
            action.to_string(),
        ) {
            return TaskStatus::Error;
        }
    }

    TaskStatus::Exit(0)
}
