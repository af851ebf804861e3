//! Trap Registry
//!
//! One slot per signal number, with slot 0 for the EXIT trap. A process-wide
//! async-signal-safe handler only increments a pending counter; the task
//! driver walks the counters between polls and runs the trap programs
//! outside signal context. The EXIT trap runs exactly once, from the
//! top-level exit path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use lazy_static::lazy_static;

use crate::ast::Program;
use crate::interp::{run_program, Context, TaskStatus};
use crate::shell::os::{self, SignalDisposition};
use crate::shell::state::ShellState;

/// Signal numbers the shell tracks. Slot 0 is EXIT.
pub const NSIG: usize = 32;

#[allow(clippy::declare_interior_mutable_const)]
const PENDING_ZERO: AtomicU32 = AtomicU32::new(0);
/// Pending delivery counters, written only from the signal handler.
static PENDING: [AtomicU32; NSIG] = [PENDING_ZERO; NSIG];

extern "C" fn handle_signal(sig: i32) {
    if (sig as usize) < NSIG {
        PENDING[sig as usize].fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrapAction {
    #[default]
    Default,
    Ignore,
    Catch,
}

#[derive(Debug, Clone, Default)]
pub struct Trap {
    pub set: bool,
    pub action: TrapAction,
    pub program: Option<Program>,
    /// The original action text, reprinted by `trap` without operands.
    pub command: String,
}

lazy_static! {
    /// POSIX signal names accepted by the `trap` and `kill` interfaces,
    /// without the SIG prefix.
    static ref SIGNAL_NAMES: HashMap<&'static str, i32> = {
        let mut m = HashMap::new();
        m.insert("EXIT", 0);
        m.insert("HUP", libc::SIGHUP);
        m.insert("INT", libc::SIGINT);
        m.insert("QUIT", libc::SIGQUIT);
        m.insert("ILL", libc::SIGILL);
        m.insert("TRAP", libc::SIGTRAP);
        m.insert("ABRT", libc::SIGABRT);
        m.insert("BUS", libc::SIGBUS);
        m.insert("FPE", libc::SIGFPE);
        m.insert("KILL", libc::SIGKILL);
        m.insert("USR1", libc::SIGUSR1);
        m.insert("SEGV", libc::SIGSEGV);
        m.insert("USR2", libc::SIGUSR2);
        m.insert("PIPE", libc::SIGPIPE);
        m.insert("ALRM", libc::SIGALRM);
        m.insert("TERM", libc::SIGTERM);
        m.insert("CHLD", libc::SIGCHLD);
        m.insert("CONT", libc::SIGCONT);
        m.insert("STOP", libc::SIGSTOP);
        m.insert("TSTP", libc::SIGTSTP);
        m.insert("TTIN", libc::SIGTTIN);
        m.insert("TTOU", libc::SIGTTOU);
        m
    };
}

/// Resolve a trap condition: a signal number or a name with or without the
/// SIG prefix.
pub fn signal_from_name(name: &str) -> Option<i32> {
    if let Ok(n) = name.parse::<i32>() {
        if n >= 0 && (n as usize) < NSIG {
            return Some(n);
        }
        return None;
    }
    let upper = name.to_ascii_uppercase();
    let stripped = upper.strip_prefix("SIG").unwrap_or(&upper);
    SIGNAL_NAMES.get(stripped).copied()
}

pub fn signal_name(sig: i32) -> String {
    for (name, n) in SIGNAL_NAMES.iter() {
        if *n == sig {
            return (*name).to_string();
        }
    }
    sig.to_string()
}

/// Install a trap action for a signal. Signal 0 (EXIT) has no process-wide
/// disposition to change.
pub fn set_trap(
    state: &mut ShellState,
    sig: i32,
    action: TrapAction,
    program: Option<Program>,
    command: String,
) -> bool {
    debug_assert!(action == TrapAction::Catch || program.is_none());

    if sig != 0 {
        let disposition = match action {
            TrapAction::Default => SignalDisposition::Default,
            TrapAction::Ignore => SignalDisposition::Ignore,
            TrapAction::Catch => SignalDisposition::Catch,
        };
        if let Err(err) = os::sigaction(sig, disposition, handle_signal) {
            eprintln!("{}: sigaction: {}", state.name(), err);
            return false;
        }
    }

    let trap = &mut state.traps[sig as usize];
    trap.set = true;
    trap.action = action;
    trap.program = program;
    trap.command = command;
    true
}

/// A forked shell resets caught traps to their default dispositions; traps
/// are not inherited by subshells.
pub fn reset_caught_traps(state: &mut ShellState) {
    for sig in 0..NSIG {
        let trap = &mut state.traps[sig];
        if !trap.set || trap.action != TrapAction::Catch {
            continue;
        }
        *trap = Trap::default();
        if sig != 0 {
            let _ = os::sigaction(sig as i32, SignalDisposition::Default, handle_signal);
        }
    }
}

/// Forked shells inherit no pending signals.
pub fn clear_pending_signals() {
    for counter in PENDING.iter() {
        counter.store(0, Ordering::Relaxed);
    }
}

/// Run the program of every pending caught signal. Called between task
/// polls; a gate prevents re-entry from inside a trap body. `$?` is
/// preserved across trap execution.
pub fn run_pending_traps(ctx: &mut Context) -> bool {
    if ctx.state.in_trap {
        return true;
    }
    ctx.state.in_trap = true;

    let saved_status = ctx.state.last_status;
    for sig in 0..NSIG {
        loop {
            if PENDING[sig].load(Ordering::Relaxed) == 0 {
                break;
            }

            let trap = &ctx.state.traps[sig];
            if !trap.set || trap.action != TrapAction::Catch || trap.program.is_none() {
                break;
            }
            let program = trap.program.clone().unwrap();

            let status = run_program(ctx.state, &program);
            if status == TaskStatus::Error {
                ctx.state.in_trap = false;
                return false;
            }

            PENDING[sig].fetch_sub(1, Ordering::Relaxed);
        }
        PENDING[sig].store(0, Ordering::Relaxed);
    }
    ctx.state.last_status = saved_status;

    ctx.state.in_trap = false;
    true
}

/// Fire the EXIT trap on the way out of the shell. Runs at most once.
pub fn run_exit_trap(state: &mut ShellState) {
    if state.exit_trap_done {
        return;
    }
    state.exit_trap_done = true;

    let trap = &state.traps[0];
    if !trap.set || trap.action != TrapAction::Catch {
        return;
    }
    let Some(program) = trap.program.clone() else {
        return;
    };

    run_program(state, &program);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_from_name() {
        assert_eq!(signal_from_name("EXIT"), Some(0));
        assert_eq!(signal_from_name("0"), Some(0));
        assert_eq!(signal_from_name("INT"), Some(libc::SIGINT));
        assert_eq!(signal_from_name("SIGTERM"), Some(libc::SIGTERM));
        assert_eq!(signal_from_name("term"), Some(libc::SIGTERM));
        assert_eq!(signal_from_name("2"), Some(2));
        assert_eq!(signal_from_name("NOSUCH"), None);
        assert_eq!(signal_from_name("-1"), None);
        assert_eq!(signal_from_name("9999"), None);
    }

    #[test]
    fn test_signal_name_round_trip() {
        assert_eq!(signal_name(0), "EXIT");
        assert_eq!(signal_from_name(&signal_name(libc::SIGUSR1)), Some(libc::SIGUSR1));
    }
}
