//! `.` (dot): read and execute commands from a file in the current
//! environment. The file is searched on `$PATH` when the operand contains
//! no slash; `return` stops the sourced script.

use crate::interp::{path, run_program, Context, TaskStatus};
use crate::parser::Parser;
use crate::shell::Branch;

pub fn builtin_dot(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let Some(operand) = argv.get(1) else {
        eprintln!("{}: usage: . file", ctx.state.name());
        return TaskStatus::Error;
    };

    let Some(file) = path::expand_path(ctx.state, operand, false) else {
        eprintln!("{}: .: {}: not found", ctx.state.name(), operand);
        return TaskStatus::Error;
    };

    let source = match std::fs::read_to_string(&file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: .: {}: {}", ctx.state.name(), file, err);
            return TaskStatus::Error;
        }
    };

    let mut parser = Parser::from_str(&source);
    parser.set_aliases(ctx.state.aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    let program = match parser.parse_program() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}: .: {}: {}", ctx.state.name(), file, err);
            return TaskStatus::Error;
        }
    };

    ctx.state.dot_depth += 1;
    let ret = run_program(ctx.state, &program);
    ctx.state.dot_depth -= 1;

    match ret {
        TaskStatus::Interrupted => {
            // `return` ends the sourced script here.
            if ctx.state.frame().branch == Branch::Return {
                ctx.state.frame_mut().branch = Branch::None;
                return TaskStatus::Exit(ctx.state.last_status);
            }
            TaskStatus::Interrupted
        }
        other => other,
    }
}
