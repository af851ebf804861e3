//! `pwd`: print the logical working directory.

use crate::interp::{Context, TaskStatus};

pub fn builtin_pwd(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    // -L is the default; -P resolves symlinks.
    let physical = matches!(argv.get(1).map(|s| s.as_str()), Some("-P"));

    if !physical {
        if let Some(pwd) = ctx.state.env_get_value("PWD") {
            if pwd.starts_with('/') {
                println!("{}", pwd);
                return TaskStatus::Exit(0);
            }
        }
    }

    match std::env::current_dir() {
        Ok(cwd) => {
            println!("{}", cwd.display());
            TaskStatus::Exit(0)
        }
        Err(err) => {
            eprintln!("{}: pwd: {}", ctx.state.name(), err);
            TaskStatus::Exit(1)
        }
    }
}
