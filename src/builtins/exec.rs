//! `exec`: replace the shell with a command, or make the invocation's
//! redirections permanent when no command is given.

use crate::interp::{path, Context, TaskStatus};
use crate::shell::state::VAR_ATTRIB_EXPORT;
use crate::shell::{os, trap};

pub fn builtin_exec(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() == 1 {
        ctx.persist_redirects = true;
        return TaskStatus::Exit(0);
    }

    let args: Vec<String> = argv[1..].to_vec();
    let Some(exec_path) = path::expand_path(ctx.state, &args[0], true) else {
        eprintln!("{}: exec: {}: not found", ctx.state.name(), args[0]);
        if !ctx.state.interactive {
            ctx.state.exit = Some(127);
        }
        return TaskStatus::Exit(127);
    };

    for (name, var) in &ctx.state.variables {
        if var.attribs & VAR_ATTRIB_EXPORT != 0 {
            os::setenv(name, &var.value);
        }
    }

    // The exec'd image starts with default dispositions for caught
    // signals.
    trap::reset_caught_traps(ctx.state);
    os::flush_stdio();

    let err = os::execv(&exec_path, &args);
    eprintln!("{}: exec: {}: {}", ctx.state.name(), args[0], err);
    let code = if err.raw_os_error() == Some(libc::ENOENT) { 127 } else { 126 };
    if !ctx.state.interactive {
        ctx.state.exit = Some(code);
    }
    TaskStatus::Exit(code)
}
