//! Shell State
//!
//! The root state owned by one shell instance: variables with attributes,
//! functions, aliases, call frames, options, the job and process tables, the
//! trap slots, and the terminal bookkeeping for job control.

use std::os::unix::io::RawFd;

use indexmap::IndexMap;

use crate::ast::Command;
use crate::shell::job::Job;
use crate::shell::os;
use crate::shell::process::Process;
use crate::shell::trap::{Trap, NSIG};

pub const VAR_ATTRIB_NONE: u32 = 0;
pub const VAR_ATTRIB_EXPORT: u32 = 1 << 0;
pub const VAR_ATTRIB_READONLY: u32 = 1 << 1;

/// A shell variable: its value and attribute bitset.
#[derive(Debug, Clone)]
pub struct Variable {
    pub value: String,
    pub attribs: u32,
}

/// A function owns a deep copy of its body so it outlives the defining
/// statement.
#[derive(Debug, Clone)]
pub struct Function {
    pub body: Command,
}

/// Loop and function control flow requested by `break`, `continue` and
/// `return`, consumed by the enclosing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    None,
    Break(u32),
    Continue(u32),
    Return,
}

/// Per-invocation record of the shell, a function call or a sourced script:
/// positional parameters and control-flow state.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// `argv[0]` is the shell or function name; the rest are the positional
    /// parameters.
    pub argv: Vec<String>,
    pub branch: Branch,
    /// Loop nesting depth inside this frame, for `break`/`continue`
    /// validation.
    pub nloops: u32,
}

impl CallFrame {
    pub fn new(argv: Vec<String>) -> CallFrame {
        debug_assert!(!argv.is_empty());
        CallFrame { argv, branch: Branch::None, nloops: 0 }
    }
}

/// All `set -o` options. `monitor` is job control; `prelookup` is `-h`.
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// set -a: export every assigned variable
    pub allexport: bool,
    /// set -b: report job completions asynchronously
    pub notify: bool,
    /// set -C: do not truncate existing files with `>`
    pub noclobber: bool,
    /// set -e: exit on a failing simple command
    pub errexit: bool,
    /// set -f: disable pathname expansion
    pub noglob: bool,
    /// set -h: cache command locations as they are found
    pub prelookup: bool,
    /// set -m: job control
    pub monitor: bool,
    /// set -n: read commands without executing them
    pub noexec: bool,
    /// set -o ignoreeof: interactive shells do not exit on EOF
    pub ignoreeof: bool,
    /// set -o nolog: do not store function definitions in history
    pub nolog: bool,
    /// set -o vi: vi-style line editing
    pub vi: bool,
    /// set -u: error on expansion of unset parameters
    pub nounset: bool,
    /// set -v: echo input lines as they are read
    pub verbose: bool,
    /// set -x: trace commands after expansion
    pub xtrace: bool,
}

/// Short option letters with their accessors, for `$-`, `set -a ...` and the
/// CLI driver.
pub const SHORT_OPTIONS: &[(char, fn(&ShellOptions) -> bool, fn(&mut ShellOptions, bool))] = &[
    ('a', |o| o.allexport, |o, v| o.allexport = v),
    ('b', |o| o.notify, |o, v| o.notify = v),
    ('C', |o| o.noclobber, |o, v| o.noclobber = v),
    ('e', |o| o.errexit, |o, v| o.errexit = v),
    ('f', |o| o.noglob, |o, v| o.noglob = v),
    ('h', |o| o.prelookup, |o, v| o.prelookup = v),
    ('m', |o| o.monitor, |o, v| o.monitor = v),
    ('n', |o| o.noexec, |o, v| o.noexec = v),
    ('u', |o| o.nounset, |o, v| o.nounset = v),
    ('v', |o| o.verbose, |o, v| o.verbose = v),
    ('x', |o| o.xtrace, |o, v| o.xtrace = v),
];

/// Long option names, for `set -o`/`set +o` and `-o` on the command line.
pub const LONG_OPTIONS: &[(&str, fn(&ShellOptions) -> bool, fn(&mut ShellOptions, bool))] = &[
    ("allexport", |o| o.allexport, |o, v| o.allexport = v),
    ("errexit", |o| o.errexit, |o, v| o.errexit = v),
    ("ignoreeof", |o| o.ignoreeof, |o, v| o.ignoreeof = v),
    ("monitor", |o| o.monitor, |o, v| o.monitor = v),
    ("noclobber", |o| o.noclobber, |o, v| o.noclobber = v),
    ("noexec", |o| o.noexec, |o, v| o.noexec = v),
    ("noglob", |o| o.noglob, |o, v| o.noglob = v),
    ("nolog", |o| o.nolog, |o, v| o.nolog = v),
    ("notify", |o| o.notify, |o, v| o.notify = v),
    ("nounset", |o| o.nounset, |o, v| o.nounset = v),
    ("prelookup", |o| o.prelookup, |o, v| o.prelookup = v),
    ("verbose", |o| o.verbose, |o, v| o.verbose = v),
    ("vi", |o| o.vi, |o, v| o.vi = v),
    ("xtrace", |o| o.xtrace, |o, v| o.xtrace = v),
];

impl ShellOptions {
    /// The value of `$-`.
    pub fn short_string(&self, interactive: bool) -> String {
        let mut out = String::new();
        for (letter, get, _) in SHORT_OPTIONS {
            if get(self) {
                out.push(*letter);
            }
        }
        if interactive {
            out.push('i');
        }
        out
    }

    pub fn set_short(&mut self, letter: char, value: bool) -> bool {
        for (opt, _, set) in SHORT_OPTIONS {
            if *opt == letter {
                set(self, value);
                return true;
            }
        }
        false
    }

    pub fn set_long(&mut self, name: &str, value: bool) -> bool {
        for (opt, _, set) in LONG_OPTIONS {
            if *opt == name {
                set(self, value);
                return true;
            }
        }
        false
    }
}

/// The root shell state.
pub struct ShellState {
    pub variables: IndexMap<String, Variable>,
    pub functions: IndexMap<String, Function>,
    pub aliases: IndexMap<String, String>,
    /// Call frames; the bottom frame is the shell invocation itself.
    pub frames: Vec<CallFrame>,
    pub options: ShellOptions,
    pub interactive: bool,

    pub jobs: Vec<Job>,
    /// Flat view of all live child processes.
    pub processes: Vec<Process>,
    /// One slot per signal number; slot 0 is the EXIT trap.
    pub traps: Vec<Trap>,
    /// Re-entrancy gate for deferred trap execution.
    pub in_trap: bool,
    pub exit_trap_done: bool,

    pub last_status: i32,
    /// Planned exit code, set by `exit` or `errexit`. Execution unwinds once
    /// this is set.
    pub exit: Option<i32>,
    /// Non-zero while evaluating an `if`/`while`/`until` condition, the left
    /// side of `&&`/`||`, or a `!` pipeline; errexit does not apply there.
    pub condition_depth: u32,

    /// Controlling terminal, or -1 when there is none.
    pub term_fd: RawFd,
    /// The shell's own process group once job control is on.
    pub pgid: os::pid_t,
    /// Default terminal modes, saved when job control is enabled.
    pub term_modes: Option<libc::termios>,
    /// At most one job owns the terminal at a time.
    pub foreground_job: Option<i32>,
    pub job_control: bool,
    /// True in forked shells (subshells, async commands, command
    /// substitution), which see only their own children.
    pub child: bool,
    /// Pid of the most recent asynchronous command, for `$!`. Zero when no
    /// background process has been started yet.
    pub last_bg_pid: os::pid_t,
    /// The main shell's pid, for `$$`. Survives subshell forks.
    pub shell_pid: os::pid_t,
    /// Nesting depth of `.` (dot) scripts, where `return` is also valid.
    pub dot_depth: u32,
}

impl ShellState {
    pub fn new(argv: Vec<String>) -> ShellState {
        ShellState {
            variables: IndexMap::new(),
            functions: IndexMap::new(),
            aliases: IndexMap::new(),
            frames: vec![CallFrame::new(argv)],
            options: ShellOptions::default(),
            interactive: false,
            jobs: Vec::new(),
            processes: Vec::new(),
            traps: (0..NSIG).map(|_| Trap::default()).collect(),
            in_trap: false,
            exit_trap_done: false,
            last_status: 0,
            exit: None,
            condition_depth: 0,
            term_fd: -1,
            pgid: 0,
            term_modes: None,
            foreground_job: None,
            job_control: false,
            child: false,
            last_bg_pid: 0,
            shell_pid: os::getpid(),
            dot_depth: 0,
        }
    }

    pub fn frame(&self) -> &CallFrame {
        self.frames.last().expect("at least one call frame")
    }

    pub fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().expect("at least one call frame")
    }

    /// The shell (or function) name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.frames[0].argv[0]
    }

    pub fn push_frame(&mut self, argv: Vec<String>) {
        self.frames.push(CallFrame::new(argv));
    }

    pub fn pop_frame(&mut self) {
        debug_assert!(self.frames.len() > 1);
        self.frames.pop();
    }

    pub fn env_get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn env_get_value(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|var| var.value.as_str())
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.env_get(name)
            .map(|var| var.attribs & VAR_ATTRIB_READONLY != 0)
            .unwrap_or(false)
    }

    /// Set a variable, merging `attribs` into any existing attribute set.
    /// Fails on readonly variables.
    pub fn env_set(&mut self, name: &str, value: &str, attribs: u32) -> Result<(), ()> {
        if self.is_readonly(name) {
            return Err(());
        }
        self.env_set_forced(name, value, attribs);
        Ok(())
    }

    /// Set a variable regardless of the readonly attribute. The shell itself
    /// uses this for `PWD` and friends.
    pub fn env_set_forced(&mut self, name: &str, value: &str, attribs: u32) {
        match self.variables.get_mut(name) {
            Some(var) => {
                var.value = value.to_string();
                var.attribs |= attribs;
            }
            None => {
                self.variables.insert(
                    name.to_string(),
                    Variable { value: value.to_string(), attribs },
                );
            }
        }
    }

    pub fn env_unset(&mut self, name: &str) -> Result<(), ()> {
        if self.is_readonly(name) {
            return Err(());
        }
        self.variables.shift_remove(name);
        Ok(())
    }

    /// Import the process environment and seed the variables POSIX requires
    /// at startup.
    pub fn populate_env(&mut self) {
        for (key, value) in std::env::vars() {
            self.env_set_forced(&key, &value, VAR_ATTRIB_EXPORT);
        }

        if self.env_get("IFS").is_none() {
            self.env_set_forced("IFS", " \t\n", VAR_ATTRIB_NONE);
        }

        self.env_set_forced("PPID", &os::getppid().to_string(), VAR_ATTRIB_NONE);

        // PWD becomes exported and readonly, computed when absent or stale.
        let cwd = std::env::current_dir()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "/".to_string());
        let pwd = match self.env_get_value("PWD") {
            Some(pwd) if pwd == cwd => pwd.to_string(),
            _ => cwd,
        };
        self.env_set_forced("PWD", &pwd, VAR_ATTRIB_EXPORT | VAR_ATTRIB_READONLY);

        if self.env_get("OPTIND").is_none() {
            self.env_set_forced("OPTIND", "1", VAR_ATTRIB_NONE);
        }
    }

    /// Positional parameters of the current frame.
    pub fn positional_params(&self) -> &[String] {
        &self.frame().argv[1..]
    }

    pub fn set_positional_params(&mut self, params: Vec<String>) {
        let frame = self.frame_mut();
        frame.argv.truncate(1);
        frame.argv.extend(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ShellState {
        ShellState::new(vec!["test-sh".to_string()])
    }

    #[test]
    fn test_env_set_get() {
        let mut state = state();
        state.env_set("FOO", "bar", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(state.env_get_value("FOO"), Some("bar"));
    }

    #[test]
    fn test_readonly_rejects_assignment() {
        let mut state = state();
        state.env_set("X", "1", VAR_ATTRIB_READONLY).unwrap();
        assert!(state.env_set("X", "2", VAR_ATTRIB_NONE).is_err());
        assert_eq!(state.env_get_value("X"), Some("1"));
        assert!(state.env_unset("X").is_err());
    }

    #[test]
    fn test_export_attribute_is_sticky() {
        let mut state = state();
        state.env_set("X", "1", VAR_ATTRIB_EXPORT).unwrap();
        state.env_set("X", "2", VAR_ATTRIB_NONE).unwrap();
        assert_ne!(state.env_get("X").unwrap().attribs & VAR_ATTRIB_EXPORT, 0);
    }

    #[test]
    fn test_option_short_string() {
        let mut state = state();
        state.options.errexit = true;
        state.options.xtrace = true;
        assert_eq!(state.options.short_string(false), "ex");
        assert_eq!(state.options.short_string(true), "exi");
    }

    #[test]
    fn test_set_long_option() {
        let mut options = ShellOptions::default();
        assert!(options.set_long("nounset", true));
        assert!(options.nounset);
        assert!(!options.set_long("bogus", true));
    }

    #[test]
    fn test_positional_params() {
        let mut state = state();
        state.set_positional_params(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(state.positional_params(), &["a", "b"]);
        assert_eq!(state.frame().argv[0], "test-sh");
    }

    #[test]
    fn test_frames() {
        let mut state = state();
        state.push_frame(vec!["fn".to_string(), "x".to_string()]);
        assert_eq!(state.positional_params(), &["x"]);
        state.pop_frame();
        assert!(state.positional_params().is_empty());
    }
}
