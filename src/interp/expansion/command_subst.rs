//! Command Substitution
//!
//! Forks a child shell whose stdout feeds a pipe, runs the embedded program
//! there, reads everything the child writes, and trims trailing newlines.
//! The read loop is one of the engine's documented suspension points.

use crate::ast::WordCommand;
use crate::interp::task::fork_subshell;
use crate::interp::{run_program, Context, TaskStatus};
use crate::shell::os;

const READ_SIZE: usize = 1024;

/// Run `$(...)` or backquotes. Returns the captured output (trailing
/// newlines removed) and the child's exit status.
pub(crate) fn run_word_command(
    ctx: &mut Context,
    wc: &WordCommand,
) -> Result<(String, i32), TaskStatus> {
    let (read_end, write_end) = os::pipe().map_err(|err| {
        eprintln!("{}: pipe: {}", ctx.state.name(), err);
        TaskStatus::Error
    })?;

    let pid = {
        let mut fork_ctx = ctx.child(-1, write_end);
        fork_ctx.job = None;
        match fork_subshell(&mut fork_ctx) {
            Ok(pid) => pid,
            Err(err) => {
                eprintln!("{}: fork: {}", ctx.state.name(), err);
                os::close(read_end);
                os::close(write_end);
                return Err(TaskStatus::Error);
            }
        }
    };

    if pid == 0 {
        os::close(read_end);
        let ret = match &wc.program {
            Some(program) => run_program(ctx.state, program),
            None => TaskStatus::Exit(0),
        };
        os::flush_stdio();
        let code = ctx.state.exit.unwrap_or(match ret {
            TaskStatus::Exit(code) => code,
            _ => 1,
        });
        std::process::exit(code);
    }

    ctx.state.process_create(pid);

    let mut output = Vec::new();
    let mut chunk = [0u8; READ_SIZE];
    loop {
        match os::read_fd(read_end, &mut chunk) {
            Ok(0) => break,
            Ok(n) => output.extend_from_slice(&chunk[..n]),
            Err(err) => {
                eprintln!("{}: read: {}", ctx.state.name(), err);
                os::close(read_end);
                return Err(TaskStatus::Error);
            }
        }
    }
    os::close(read_end);

    let status = ctx.state.job_wait_process(pid);
    ctx.state.process_remove(pid);
    let status = match status {
        TaskStatus::Exit(code) => code,
        _ => return Err(TaskStatus::Error),
    };

    // Trim trailing newlines only.
    let mut text = String::from_utf8_lossy(&output).into_owned();
    while text.ends_with('\n') {
        text.pop();
    }

    Ok((text, status))
}
