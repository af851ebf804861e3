//! `cd`: change the working directory, honoring `$HOME`, `$CDPATH` and
//! `cd -`, and keeping `$PWD`/`$OLDPWD` in sync.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::state::{ShellState, VAR_ATTRIB_EXPORT, VAR_ATTRIB_NONE};

fn chdir(state: &mut ShellState, path: &str) -> TaskStatus {
    let old_pwd = state.env_get_value("PWD").map(|s| s.to_string());

    if let Err(err) = std::env::set_current_dir(path) {
        eprintln!("{}: cd: {}: {}", state.name(), path, err);
        return TaskStatus::Exit(1);
    }
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd.to_string_lossy().into_owned(),
        Err(err) => {
            eprintln!("{}: cd: {}", state.name(), err);
            return TaskStatus::Exit(1);
        }
    };

    if let Some(old_pwd) = old_pwd {
        state.env_set_forced("OLDPWD", &old_pwd, VAR_ATTRIB_NONE);
    }
    // PWD carries the readonly attribute; the shell bypasses it here.
    state.env_set_forced("PWD", &cwd, VAR_ATTRIB_EXPORT);
    TaskStatus::Exit(0)
}

fn is_dir(path: &str) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

pub fn builtin_cd(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut operands = &argv[1..];
    // -L is the default behavior; -P is not supported.
    match operands.first().map(|s| s.as_str()) {
        Some("-L") => operands = &operands[1..],
        Some("-P") => {
            eprintln!("{}: cd: -P is not supported", ctx.state.name());
            return TaskStatus::Exit(1);
        }
        Some(arg) if arg.starts_with('-') && arg != "-" => {
            return usage_error(ctx, "cd [-L] [-|directory]");
        }
        _ => {}
    }
    if operands.len() > 1 {
        return usage_error(ctx, "cd [-L] [-|directory]");
    }

    let Some(operand) = operands.first() else {
        let Some(home) = ctx.state.env_get_value("HOME").map(|s| s.to_string()) else {
            eprintln!(
                "{}: cd: no directory operand and $HOME is not set",
                ctx.state.name()
            );
            return TaskStatus::Exit(1);
        };
        if home.is_empty() {
            return TaskStatus::Exit(0);
        }
        return chdir(ctx.state, &home);
    };

    // `cd -` swaps PWD and OLDPWD, printing the new directory.
    if operand == "-" {
        let Some(old_pwd) = ctx.state.env_get_value("OLDPWD").map(|s| s.to_string())
        else {
            eprintln!("{}: cd: OLDPWD is not set", ctx.state.name());
            return TaskStatus::Exit(1);
        };
        let ret = chdir(ctx.state, &old_pwd);
        if ret == TaskStatus::Exit(0) {
            println!("{}", old_pwd);
        }
        return ret;
    }

    // A relative operand searches $CDPATH first.
    if !operand.starts_with('/')
        && !operand.starts_with("./")
        && !operand.starts_with("../")
    {
        if let Some(cdpath) = ctx.state.env_get_value("CDPATH").map(|s| s.to_string()) {
            for base in cdpath.split(':') {
                let base = if base.is_empty() { "." } else { base };
                let path = if base.ends_with('/') {
                    format!("{}{}", base, operand)
                } else {
                    format!("{}/{}", base, operand)
                };
                if is_dir(&path) {
                    let ret = chdir(ctx.state, &path);
                    if ret == TaskStatus::Exit(0) && base != "." {
                        if let Some(pwd) = ctx.state.env_get_value("PWD") {
                            println!("{}", pwd);
                        }
                    }
                    return ret;
                }
            }
        }
    }

    chdir(ctx.state, operand)
}
