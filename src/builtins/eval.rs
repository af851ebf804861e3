//! `eval`: concatenate the operands and execute them as shell input.

use crate::interp::{run_program, Context, TaskStatus};
use crate::parser::Parser;

pub fn builtin_eval(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() < 2 {
        return TaskStatus::Exit(0);
    }

    let source = argv[1..].join(" ");
    if source.trim().is_empty() {
        return TaskStatus::Exit(0);
    }

    let mut parser = Parser::from_str(&source);
    parser.set_aliases(ctx.state.aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    let program = match parser.parse_program() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}: eval: {}", ctx.state.name(), err);
            return TaskStatus::Error;
        }
    };

    run_program(ctx.state, &program)
}
