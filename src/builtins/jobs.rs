//! `jobs`: report the status of background and stopped jobs.

use crate::ast::print::format_node;
use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::state::ShellState;

fn job_state_str(state: &ShellState, job_id: i32) -> String {
    match state.job_poll(job_id) {
        TaskStatus::Wait => "Running".to_string(),
        TaskStatus::Error => "Error".to_string(),
        TaskStatus::Stopped => {
            let sig = state
                .job_get(job_id)
                .and_then(|job| job.processes.first())
                .and_then(|&pid| state.process_get(pid))
                .map(|proc| proc.last_sig)
                .unwrap_or(0);
            match sig {
                libc::SIGSTOP => "Stopped (SIGSTOP)".to_string(),
                libc::SIGTTIN => "Stopped (SIGTTIN)".to_string(),
                libc::SIGTTOU => "Stopped (SIGTTOU)".to_string(),
                _ => "Stopped".to_string(),
            }
        }
        TaskStatus::Exit(0) => "Done".to_string(),
        TaskStatus::Exit(code) => format!("Done({})", code),
        TaskStatus::Interrupted => unreachable!(),
    }
}

pub fn builtin_jobs(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut pids_only = false;
    let mut long = false;
    for arg in &argv[1..] {
        match arg.as_str() {
            "-p" => pids_only = true,
            "-l" => long = true,
            _ => return usage_error(ctx, "jobs [-l|-p]"),
        }
    }
    if pids_only && long {
        eprintln!(
            "{}: jobs: the -p and -l options are mutually exclusive",
            ctx.state.name()
        );
        return TaskStatus::Exit(1);
    }

    let current = ctx.state.job_by_id("%+").ok();

    let ids: Vec<i32> = ctx.state.jobs.iter().map(|job| job.job_id).collect();
    for job_id in ids {
        if pids_only {
            if let Some(job) = ctx.state.job_get(job_id) {
                for pid in &job.processes {
                    println!("{}", pid);
                }
            }
            continue;
        }

        let marker = if current == Some(job_id) { '+' } else { ' ' };
        let state_str = job_state_str(ctx.state, job_id);
        let Some(job) = ctx.state.job_get(job_id) else {
            continue;
        };
        let cmd = format_node(&job.node);
        if long {
            println!("[{}] {} {} {} {}", job_id, marker, job.pgid, state_str, cmd);
        } else {
            println!("[{}] {} {} {}", job_id, marker, state_str, cmd);
        }
    }

    TaskStatus::Exit(0)
}
