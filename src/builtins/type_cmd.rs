//! `type`: report how each name would be interpreted as a command.

use crate::builtins;
use crate::interp::{path, Context, TaskStatus};

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "do", "done", "case", "esac", "while",
    "until", "for", "{", "}", "!", "in",
];

pub fn builtin_type(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut status = 0;
    for name in &argv[1..] {
        if RESERVED_WORDS.contains(&name.as_str()) {
            println!("{} is a shell keyword", name);
        } else if let Some(value) = ctx.state.aliases.get(name) {
            println!("{} is an alias for {}", name, value);
        } else if ctx.state.functions.contains_key(name) {
            println!("{} is a function", name);
        } else if builtins::has_special_builtin(name) {
            println!("{} is a special shell builtin", name);
        } else if builtins::has_builtin(name) {
            println!("{} is a shell builtin", name);
        } else if let Some(found) = path::expand_path(ctx.state, name, true) {
            println!("{} is {}", name, found);
        } else {
            eprintln!("{}: type: {}: not found", ctx.state.name(), name);
            status = 1;
        }
    }
    TaskStatus::Exit(status)
}
