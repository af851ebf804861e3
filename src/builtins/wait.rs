//! `wait`: wait for asynchronous jobs or specific processes.

use crate::interp::{Context, TaskStatus};
use crate::shell::os;

pub fn builtin_wait(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() == 1 {
        // Wait for every known live process.
        loop {
            let pending: Vec<os::pid_t> = ctx
                .state
                .processes
                .iter()
                .filter(|proc| !proc.terminated && !proc.stopped)
                .map(|proc| proc.pid)
                .collect();
            if pending.is_empty() {
                return TaskStatus::Exit(0);
            }
            for pid in pending {
                if ctx.state.job_wait_process(pid) == TaskStatus::Error {
                    return TaskStatus::Error;
                }
            }
        }
    }

    let mut status = 0;
    for operand in &argv[1..] {
        let pid = if operand.starts_with('%') {
            match ctx.state.job_by_id(operand) {
                Ok(job_id) => {
                    let ret = ctx.state.job_wait(job_id);
                    status = ret.code();
                    continue;
                }
                Err(err) => {
                    eprintln!("{}: wait: {}", ctx.state.name(), err);
                    status = 127;
                    continue;
                }
            }
        } else {
            match operand.parse::<os::pid_t>() {
                Ok(pid) => pid,
                Err(_) => {
                    eprintln!("{}: wait: invalid pid '{}'", ctx.state.name(), operand);
                    status = 127;
                    continue;
                }
            }
        };

        if ctx.state.process_get(pid).is_none() {
            // Not a child of this shell.
            status = 127;
            continue;
        }
        status = ctx.state.job_wait_process(pid).code();
    }

    TaskStatus::Exit(status)
}
