//! `fg`: move a job to the foreground, continue it if stopped, and wait.

use crate::ast::print::format_node;
use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};

pub fn builtin_fg(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if !ctx.state.job_control {
        eprintln!("{}: fg: job control is not enabled", ctx.state.name());
        return TaskStatus::Exit(1);
    }
    if argv.len() > 2 {
        return usage_error(ctx, "fg [job_id]");
    }

    let spec = argv.get(1).map(|s| s.as_str()).unwrap_or("%%");
    let job_id = match ctx.state.job_by_id(spec) {
        Ok(job_id) => job_id,
        Err(err) => {
            eprintln!("{}: fg: {}", ctx.state.name(), err);
            return TaskStatus::Exit(1);
        }
    };

    if let Some(job) = ctx.state.job_get(job_id) {
        println!("{}", format_node(&job.node));
    }

    ctx.state.job_set_foreground(job_id, true, true);
    let ret = ctx.state.job_wait(job_id);
    if ctx.state.foreground_job == Some(job_id) {
        ctx.state.job_set_foreground(job_id, false, false);
    }

    ret
}
