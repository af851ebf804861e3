//! `export` and `readonly`: set variable attributes, optionally assigning,
//! and print the attributed variables with `-p` or no operands.

use crate::interp::{Context, TaskStatus};
use crate::shell::state::{VAR_ATTRIB_EXPORT, VAR_ATTRIB_READONLY};

/// Quote a value for reinput, the way `set`, `export -p` and `alias` print.
pub(crate) fn escaped(value: &str) -> String {
    const SAFE: &str = "@%+=:,./-";
    if !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || SAFE.contains(c))
    {
        return value.to_string();
    }
    let mut out = String::from("'");
    for c in value.chars() {
        if c == '\'' {
            out.push_str("'\"'\"'");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn attrib_builtin(ctx: &mut Context, argv: &[String], attrib: u32) -> TaskStatus {
    let mut operands = &argv[1..];
    let print_only = match operands.first().map(|s| s.as_str()) {
        Some("-p") => {
            operands = &operands[1..];
            true
        }
        _ => false,
    };

    if print_only || operands.is_empty() {
        let mut names: Vec<&String> = ctx
            .state
            .variables
            .iter()
            .filter(|(_, var)| var.attribs & attrib != 0)
            .map(|(name, _)| name)
            .collect();
        names.sort();
        for name in names {
            let value = &ctx.state.variables[name.as_str()].value;
            println!("{} {}={}", argv[0], name, escaped(value));
        }
        return TaskStatus::Exit(0);
    }

    for operand in operands {
        let (name, value) = match operand.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (operand.as_str(), None),
        };
        if !is_valid_name(name) {
            eprintln!("{}: {}: not a valid name", ctx.state.name(), name);
            return TaskStatus::Error;
        }

        match value {
            Some(value) => {
                if ctx.state.env_set(name, value, attrib).is_err() {
                    eprintln!(
                        "{}: cannot modify readonly variable {}",
                        ctx.state.name(),
                        name
                    );
                    return TaskStatus::Error;
                }
            }
            None => match ctx.state.variables.get_mut(name) {
                Some(var) => var.attribs |= attrib,
                None => ctx.state.env_set_forced(name, "", attrib),
            },
        }
    }

    TaskStatus::Exit(0)
}

pub fn builtin_export(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    attrib_builtin(ctx, argv, VAR_ATTRIB_EXPORT)
}

pub fn builtin_readonly(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    attrib_builtin(ctx, argv, VAR_ATTRIB_READONLY)
}
