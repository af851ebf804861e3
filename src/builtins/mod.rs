//! Built-in Commands
//!
//! The POSIX built-in set, each a synchronous function taking the execution
//! context and the expanded argv. Special built-ins (POSIX §2.14) keep
//! their assignments in the shell environment and abort a non-interactive
//! shell on error; regular built-ins behave like commands. Names POSIX
//! leaves explicitly unspecified resolve to a stub so scripts relying on
//! other shells' extensions fail cleanly.

mod alias;
mod bg;
mod break_cmd;
mod cd;
mod colon;
mod dot;
mod eval;
mod exec;
mod exit;
mod export;
mod fg;
mod getopts;
mod jobs;
mod pwd;
mod read;
mod return_cmd;
mod set;
mod shift;
mod times;
mod trap_cmd;
mod true_false;
mod type_cmd;
mod umask;
mod unset;
mod wait;

use crate::interp::{Context, TaskStatus};

pub type BuiltinFn = fn(&mut Context, &[String]) -> TaskStatus;

pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
    pub special: bool,
}

/// Keep alpha sorted; lookup is a binary search.
static BUILTINS: &[Builtin] = &[
    Builtin { name: ".", func: dot::builtin_dot, special: true },
    Builtin { name: ":", func: colon::builtin_colon, special: true },
    Builtin { name: "alias", func: alias::builtin_alias, special: false },
    Builtin { name: "bg", func: bg::builtin_bg, special: false },
    Builtin { name: "break", func: break_cmd::builtin_break, special: true },
    Builtin { name: "cd", func: cd::builtin_cd, special: false },
    Builtin { name: "continue", func: break_cmd::builtin_continue, special: true },
    Builtin { name: "eval", func: eval::builtin_eval, special: true },
    Builtin { name: "exec", func: exec::builtin_exec, special: true },
    Builtin { name: "exit", func: exit::builtin_exit, special: true },
    Builtin { name: "export", func: export::builtin_export, special: true },
    Builtin { name: "false", func: true_false::builtin_false, special: false },
    Builtin { name: "fg", func: fg::builtin_fg, special: false },
    Builtin { name: "getopts", func: getopts::builtin_getopts, special: false },
    Builtin { name: "jobs", func: jobs::builtin_jobs, special: false },
    Builtin { name: "pwd", func: pwd::builtin_pwd, special: false },
    Builtin { name: "read", func: read::builtin_read, special: false },
    Builtin { name: "readonly", func: export::builtin_readonly, special: true },
    Builtin { name: "return", func: return_cmd::builtin_return, special: true },
    Builtin { name: "set", func: set::builtin_set, special: true },
    Builtin { name: "shift", func: shift::builtin_shift, special: true },
    Builtin { name: "times", func: times::builtin_times, special: true },
    Builtin { name: "trap", func: trap_cmd::builtin_trap, special: true },
    Builtin { name: "true", func: true_false::builtin_true, special: false },
    Builtin { name: "type", func: type_cmd::builtin_type, special: false },
    Builtin { name: "umask", func: umask::builtin_umask, special: false },
    Builtin { name: "unalias", func: alias::builtin_unalias, special: false },
    Builtin { name: "unset", func: unset::builtin_unset, special: true },
    Builtin { name: "wait", func: wait::builtin_wait, special: false },
];

/// Commands POSIX explicitly leaves unspecified.
static UNSPECIFIED_NAMES: &[&str] = &[
    "alloc", "autoload", "bind", "bindkey", "builtin", "bye", "caller", "cap",
    "chdir", "clone", "comparguments", "compcall", "compctl", "compdescribe",
    "compfiles", "compgen", "compgroups", "complete", "compquote", "comptags",
    "comptry", "compvalues", "declare", "dirs", "disable", "disown", "dosh",
    "echotc", "echoti", "help", "hist", "history", "let", "local", "login",
    "logout", "map", "mapfile", "popd", "print", "pushd", "readarray", "repeat",
    "savehistory", "shopt", "source", "stop", "suspend", "typeset", "whence",
];

fn builtin_unspecified(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    eprintln!(
        "{}: {}: unspecified behavior according to POSIX, not supported",
        ctx.state.name(),
        argv[0]
    );
    TaskStatus::Exit(127)
}

static UNSPECIFIED: Builtin =
    Builtin { name: "unspecified", func: builtin_unspecified, special: false };

pub fn get_builtin(name: &str) -> Option<&'static Builtin> {
    if UNSPECIFIED_NAMES.binary_search(&name).is_ok() {
        return Some(&UNSPECIFIED);
    }
    BUILTINS
        .binary_search_by(|builtin| builtin.name.cmp(name))
        .ok()
        .map(|i| &BUILTINS[i])
}

pub fn has_builtin(name: &str) -> bool {
    get_builtin(name).is_some()
}

pub fn has_special_builtin(name: &str) -> bool {
    get_builtin(name).map(|b| b.special).unwrap_or(false)
}

pub fn run_builtin(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    debug_assert!(!argv.is_empty());
    match get_builtin(&argv[0]) {
        Some(builtin) => (builtin.func)(ctx, argv),
        None => TaskStatus::Error,
    }
}

/// Report a usage error: status 2, per the exit-code conventions.
pub(crate) fn usage_error(ctx: &mut Context, usage: &str) -> TaskStatus {
    eprintln!("{}: usage: {}", ctx.state.name(), usage);
    TaskStatus::Exit(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_sorted() {
        for pair in BUILTINS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
        for pair in UNSPECIFIED_NAMES.windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_lookup() {
        assert!(has_builtin("cd"));
        assert!(has_builtin(":"));
        assert!(has_builtin("declare"));
        assert!(!has_builtin("ls"));
    }

    #[test]
    fn test_special_classification() {
        assert!(has_special_builtin("exit"));
        assert!(has_special_builtin("."));
        assert!(has_special_builtin("eval"));
        assert!(!has_special_builtin("cd"));
        assert!(!has_special_builtin("jobs"));
        assert!(!has_special_builtin("declare"));
    }
}
