//! Execution Engine
//!
//! The shell executes a program by translating its AST into a tree of
//! cooperative tasks driven by a single poll loop. Concurrency only arises
//! through child processes; the loop blocks in `waitpid` at well-defined
//! suspension points and runs pending traps between polls.

pub mod expansion;
pub mod path;
pub mod redirect;
pub mod task;

use std::os::unix::io::RawFd;

use crate::ast::Program;
use crate::shell::state::ShellState;

/// The result of polling a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not finished; poll again after the next wait.
    Wait,
    /// Fatal, unrecoverable.
    Error,
    /// The task or a process it owns is stopped. The top-level driver
    /// reports it as status 148.
    Stopped,
    /// `break`, `continue` or `return` is unwinding to the nearest handler;
    /// the call frame's branch field says which.
    Interrupted,
    /// Finished with an exit status.
    Exit(i32),
}

impl TaskStatus {
    pub fn is_final(&self) -> bool {
        *self != TaskStatus::Wait
    }

    /// The numeric status the driver records, with stopped jobs reported
    /// as 148.
    pub fn code(&self) -> i32 {
        match self {
            TaskStatus::Exit(code) => *code,
            TaskStatus::Stopped => 148,
            _ => 1,
        }
    }
}

/// Per-task execution context: the shell state plus the pipeline plumbing
/// for the next fork.
pub struct Context<'a> {
    pub state: &'a mut ShellState,
    /// Pipe end to install as the child's stdin, or -1 to inherit.
    pub stdin_fileno: RawFd,
    /// Pipe end to install as the child's stdout, or -1 to inherit.
    pub stdout_fileno: RawFd,
    /// The job the next forked process joins. Pipelines create it.
    pub job: Option<i32>,
    /// True under an asynchronous (`&`) command.
    pub background: bool,
    /// Status of the most recent command substitution, which becomes the
    /// status of a bare-assignment command.
    pub last_cmdsubst_status: Option<i32>,
    /// Set by `exec` without a command: its redirections outlive the
    /// builtin instead of being restored.
    pub persist_redirects: bool,
}

impl<'a> Context<'a> {
    pub fn new(state: &'a mut ShellState) -> Context<'a> {
        Context {
            state,
            stdin_fileno: -1,
            stdout_fileno: -1,
            job: None,
            background: false,
            last_cmdsubst_status: None,
            persist_redirects: false,
        }
    }

    /// Reborrow for a child task, overriding the pipe ends.
    pub fn child(&mut self, stdin_fileno: RawFd, stdout_fileno: RawFd) -> Context<'_> {
        Context {
            state: &mut *self.state,
            stdin_fileno,
            stdout_fileno,
            job: self.job,
            background: self.background,
            last_cmdsubst_status: None,
            persist_redirects: false,
        }
    }
}

/// Run a parsed program to completion in the current shell.
pub fn run_program(state: &mut ShellState, program: &Program) -> TaskStatus {
    let mut task = task::task_for_command_list_array(&program.body);
    let mut ctx = Context::new(state);
    task::task_run(&mut task, &mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::VAR_ATTRIB_NONE;

    /// A shell for tests. Marked as a child shell so every wait targets a
    /// specific pid and concurrently running tests never steal each
    /// other's children.
    fn test_state() -> ShellState {
        let mut state = ShellState::new(vec!["test-sh".to_string()]);
        state.child = true;
        state
    }

    fn run(state: &mut ShellState, src: &str) -> TaskStatus {
        let program = crate::parser::parse(src).expect("parse failed");
        run_program(state, &program)
    }

    fn var<'a>(state: &'a ShellState, name: &str) -> &'a str {
        state.env_get_value(name).unwrap_or_else(|| panic!("{} unset", name))
    }

    #[test]
    fn test_assignment_and_expansion() {
        let mut state = test_state();
        run(&mut state, "x=1; y=$x$x");
        assert_eq!(var(&state, "y"), "11");
        assert_eq!(state.last_status, 0);
    }

    #[test]
    fn test_builtin_exit_status() {
        let mut state = test_state();
        run(&mut state, "false");
        assert_eq!(state.last_status, 1);
        run(&mut state, "true");
        assert_eq!(state.last_status, 0);
    }

    #[test]
    fn test_last_status_parameter() {
        let mut state = test_state();
        run(&mut state, "false; x=$?; true; y=$?");
        assert_eq!(var(&state, "x"), "1");
        assert_eq!(var(&state, "y"), "0");
    }

    #[test]
    fn test_and_or_lists() {
        let mut state = test_state();
        run(&mut state, "false && x=no || x=yes");
        assert_eq!(var(&state, "x"), "yes");
        run(&mut state, "true && y=yes || y=no");
        assert_eq!(var(&state, "y"), "yes");
    }

    #[test]
    fn test_bang_inverts() {
        let mut state = test_state();
        run(&mut state, "! false");
        assert_eq!(state.last_status, 0);
        run(&mut state, "! true");
        assert_eq!(state.last_status, 1);
    }

    #[test]
    fn test_if_else() {
        let mut state = test_state();
        run(&mut state, "if true; then r=then; else r=else; fi");
        assert_eq!(var(&state, "r"), "then");
        run(&mut state, "if false; then r=then; elif true; then r=elif; fi");
        assert_eq!(var(&state, "r"), "elif");
        run(&mut state, "if false; then r=then; fi");
        assert_eq!(state.last_status, 0);
    }

    #[test]
    fn test_for_loop() {
        let mut state = test_state();
        run(&mut state, "out=; for i in a b c; do out=$out$i,; done");
        assert_eq!(var(&state, "out"), "a,b,c,");
        assert_eq!(var(&state, "i"), "c");
    }

    #[test]
    fn test_for_over_positional_params() {
        let mut state = test_state();
        run(&mut state, "set -- p q; out=; for a; do out=$out$a.; done");
        assert_eq!(var(&state, "out"), "p.q.");
    }

    #[test]
    fn test_while_with_break() {
        let mut state = test_state();
        run(
            &mut state,
            "i=0; while :; do i=$((i+1)); case $i in 3) break;; esac; done",
        );
        assert_eq!(var(&state, "i"), "3");
    }

    #[test]
    fn test_until_loop() {
        let mut state = test_state();
        run(&mut state, "i=0; until case $i in 3) true;; *) false;; esac; do i=$((i+1)); done");
        assert_eq!(var(&state, "i"), "3");
    }

    #[test]
    fn test_continue_skips_iteration() {
        let mut state = test_state();
        run(
            &mut state,
            "out=; for i in 1 2 3; do case $i in 2) continue;; esac; out=$out$i; done",
        );
        assert_eq!(var(&state, "out"), "13");
    }

    #[test]
    fn test_nested_break_levels() {
        let mut state = test_state();
        run(
            &mut state,
            "out=; for i in a b; do for j in x y; do out=$out$i$j; break 2; done; done",
        );
        assert_eq!(var(&state, "out"), "ax");
    }

    #[test]
    fn test_case_first_match_wins() {
        let mut state = test_state();
        run(&mut state, "case abc in a*) r=glob;; abc) r=exact;; esac");
        assert_eq!(var(&state, "r"), "glob");
        run(&mut state, "case xyz in a*) r2=a;; *) r2=default;; esac");
        assert_eq!(var(&state, "r2"), "default");
    }

    #[test]
    fn test_case_quoted_pattern_is_literal() {
        let mut state = test_state();
        run(&mut state, "case 'a*' in 'a*') r=literal;; a?) r=glob;; esac");
        assert_eq!(var(&state, "r"), "literal");
    }

    #[test]
    fn test_function_call_and_params() {
        let mut state = test_state();
        run(&mut state, "f() { r=$1; n=$#; }; f hello world");
        assert_eq!(var(&state, "r"), "hello");
        assert_eq!(var(&state, "n"), "2");
        // Positional parameters are restored after the call.
        run(&mut state, "outer=$#");
        assert_eq!(var(&state, "outer"), "0");
    }

    #[test]
    fn test_function_return_status() {
        let mut state = test_state();
        run(&mut state, "f() { return 3; }; f");
        assert_eq!(state.last_status, 3);
        // A return mid-body skips the rest.
        run(&mut state, "g() { x=before; return 0; x=after; }; g");
        assert_eq!(var(&state, "x"), "before");
    }

    #[test]
    fn test_arithmetic_expansion() {
        let mut state = test_state();
        run(&mut state, "x=$((2 + 3 * 4))");
        assert_eq!(var(&state, "x"), "14");
        run(&mut state, "n=5; y=$((n * 2))");
        assert_eq!(var(&state, "y"), "10");
    }

    #[test]
    fn test_arithmetic_assignment_operator() {
        let mut state = test_state();
        run(&mut state, "i=1; j=$((i += 4))");
        assert_eq!(var(&state, "i"), "5");
        assert_eq!(var(&state, "j"), "5");
    }

    #[test]
    fn test_parameter_defaults() {
        let mut state = test_state();
        run(&mut state, "x=${unset_var:-fallback}");
        assert_eq!(var(&state, "x"), "fallback");
        run(&mut state, "y=${unset_var2:=assigned}; z=$unset_var2");
        assert_eq!(var(&state, "z"), "assigned");
    }

    #[test]
    fn test_quoting_preserves_value() {
        let mut state = test_state();
        run(&mut state, "v='a  b  c'; w=\"$v\"");
        assert_eq!(var(&state, "w"), "a  b  c");
    }

    #[test]
    fn test_quoted_at_in_for() {
        let mut state = test_state();
        state.env_set("IFS", ":", VAR_ATTRIB_NONE).unwrap();
        run(
            &mut state,
            "set -- a:b c:d; out=; for a in \"$@\"; do out=\"$out<$a>\"; done",
        );
        assert_eq!(var(&state, "out"), "<a:b><c:d>");
    }

    #[test]
    fn test_unquoted_expansion_splits() {
        let mut state = test_state();
        run(&mut state, "v='a b c'; out=; for w in $v; do out=$out$w.; done");
        assert_eq!(var(&state, "out"), "a.b.c.");
    }

    #[test]
    fn test_empty_at_yields_zero_iterations() {
        let mut state = test_state();
        run(&mut state, "out=none; for a in \"$@\"; do out=$a; done");
        assert_eq!(var(&state, "out"), "none");
    }

    #[test]
    fn test_errexit_stops_list() {
        let mut state = test_state();
        run(&mut state, "set -e\nfalse\nx=after");
        assert_eq!(state.exit, Some(1));
        assert!(state.env_get_value("x").is_none());
    }

    #[test]
    fn test_errexit_spares_conditions() {
        let mut state = test_state();
        run(&mut state, "set -e\nif false; then :; fi\nx=ok");
        assert_eq!(state.exit, None);
        assert_eq!(var(&state, "x"), "ok");
    }

    #[test]
    fn test_exit_stops_execution() {
        let mut state = test_state();
        let ret = run(&mut state, "x=1; exit 7; x=2");
        assert_eq!(state.exit, Some(7));
        assert_eq!(ret, TaskStatus::Exit(7));
        assert_eq!(var(&state, "x"), "1");
    }

    #[test]
    fn test_readonly_assignment_fails() {
        let mut state = test_state();
        run(&mut state, "readonly fixed=1");
        let ret = run(&mut state, "fixed=2");
        assert_eq!(ret, TaskStatus::Error);
        assert_eq!(var(&state, "fixed"), "1");
    }

    #[test]
    fn test_eval_runs_in_current_environment() {
        let mut state = test_state();
        run(&mut state, "eval 'x=42; y=$x'");
        assert_eq!(var(&state, "y"), "42");
    }

    #[test]
    fn test_shift() {
        let mut state = test_state();
        run(&mut state, "set -- a b c; shift; first=$1; count=$#");
        assert_eq!(var(&state, "first"), "b");
        assert_eq!(var(&state, "count"), "2");
    }

    #[test]
    fn test_exit_trap_runs_once() {
        let mut state = test_state();
        run(&mut state, "trap 'trapped=$((${trapped:-0} + 1))' EXIT");
        crate::shell::trap::run_exit_trap(&mut state);
        crate::shell::trap::run_exit_trap(&mut state);
        assert_eq!(var(&state, "trapped"), "1");
    }

    #[test]
    fn test_subshell_does_not_leak_assignments() {
        let mut state = test_state();
        run(&mut state, "x=1; (x=2; true)");
        assert_eq!(var(&state, "x"), "1");
        assert_eq!(state.last_status, 0);
    }

    #[test]
    fn test_subshell_exit_status() {
        let mut state = test_state();
        run(&mut state, "(false)");
        assert_eq!(state.last_status, 1);
        run(&mut state, "(exit 5)");
        assert_eq!(state.last_status, 5);
    }

    #[test]
    fn test_command_substitution_captures_builtin_output() {
        let mut state = test_state();
        state.env_set("PWD", "/somewhere", VAR_ATTRIB_NONE).unwrap();
        run(&mut state, "x=$(pwd)");
        assert_eq!(var(&state, "x"), "/somewhere");
    }

    #[test]
    fn test_command_substitution_status_of_bare_assignment() {
        let mut state = test_state();
        run(&mut state, "x=$(false); s=$?");
        assert_eq!(var(&state, "s"), "1");
    }

    #[test]
    fn test_here_document_feeds_read() {
        let mut state = test_state();
        run(&mut state, "name=alice; read line <<EOF\nhello $name\nEOF");
        assert_eq!(var(&state, "line"), "hello alice");
    }

    #[test]
    fn test_here_document_quoted_delimiter_is_literal() {
        let mut state = test_state();
        run(&mut state, "read line <<'EOF'\nhello $name\nEOF");
        assert_eq!(var(&state, "line"), "hello $name");
    }

    #[test]
    fn test_redirect_to_file_and_back() {
        let mut state = test_state();
        let path = std::env::temp_dir().join(format!(
            "just-sh-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let path_str = path.to_string_lossy().into_owned();

        run(
            &mut state,
            &format!("PWD=/data pwd > {p}; read back < {p}", p = path_str),
        );
        assert_eq!(var(&state, "back"), "/data");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_noclobber_refuses_truncation() {
        let mut state = test_state();
        let path = std::env::temp_dir().join(format!(
            "just-sh-clobber-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let path_str = path.to_string_lossy().into_owned();
        std::fs::write(&path, "keep").unwrap();

        run(&mut state, &format!("set -C; pwd > {}", path_str));
        assert_eq!(state.last_status, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_dot_script(){
        let mut state = test_state();
        let path = std::env::temp_dir().join(format!(
            "just-sh-dot-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::write(&path, "sourced=yes\nreturn 4\nsourced=no\n").unwrap();

        run(&mut state, &format!(". {}", path.to_string_lossy()));
        assert_eq!(var(&state, "sourced"), "yes");
        assert_eq!(state.last_status, 4);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unknown_command_is_127() {
        let mut state = test_state();
        state.env_set("PATH", "/nonexistent-dir-zzz", VAR_ATTRIB_NONE).unwrap();
        run(&mut state, "definitely-no-such-command");
        assert_eq!(state.last_status, 127);
    }

    #[test]
    fn test_tilde_in_assignment() {
        let mut state = test_state();
        state.env_set("HOME", "/home/tester", VAR_ATTRIB_NONE).unwrap();
        run(&mut state, "p=~/bin");
        assert_eq!(var(&state, "p"), "/home/tester/bin");
    }

    #[test]
    fn test_unmatched_glob_stays_literal() {
        let mut state = test_state();
        run(&mut state, "for f in /no-such-dir-zzz/*; do r=$f; done");
        assert_eq!(var(&state, "r"), "/no-such-dir-zzz/*");
    }

    #[test]
    fn test_alias_applies_on_following_line() {
        let mut state = test_state();
        // Aliases resolve at parse time, so feed lines separately the way
        // the front-end drivers do.
        run(&mut state, "alias setx='x='");
        let snapshot = state
            .aliases
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut parser = crate::parser::Parser::from_str("setx42");
        parser.set_aliases(snapshot);
        let program = parser.parse_program().unwrap();
        run_program(&mut state, &program);
        assert_eq!(var(&state, "x"), "42");
    }
}
