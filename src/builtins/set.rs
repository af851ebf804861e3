//! `set`: print variables, toggle shell options, and replace the positional
//! parameters.

use crate::builtins::export::escaped;
use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::state::LONG_OPTIONS;

const SET_USAGE: &str = "set [(-|+)abCefhmnuvx] [-o option] [--] [args...]";

pub fn builtin_set(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() == 1 {
        let mut names: Vec<&String> = ctx.state.variables.keys().collect();
        names.sort();
        for name in names {
            let value = &ctx.state.variables[name.as_str()].value;
            println!("{}={}", name, escaped(value));
        }
        return TaskStatus::Exit(0);
    }

    let mut i = 1;
    let mut positional = None;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if arg == "--" {
            positional = Some(i + 1);
            break;
        }
        let enable = match arg.chars().next() {
            Some('-') => true,
            Some('+') => false,
            _ => {
                positional = Some(i);
                break;
            }
        };
        if arg.len() == 1 {
            // A lone `-` ends option processing.
            positional = Some(i + 1);
            break;
        }

        if &arg[1..] == "o" {
            let Some(name) = argv.get(i + 1) else {
                // `set -o` without an option name lists all options.
                for (name, get, _) in LONG_OPTIONS {
                    let value = if get(&ctx.state.options) { "on" } else { "off" };
                    println!("{:<12}{}", name, value);
                }
                return TaskStatus::Exit(0);
            };
            if !ctx.state.options.set_long(name, enable) {
                return usage_error(ctx, SET_USAGE);
            }
            i += 2;
            continue;
        }

        for letter in arg[1..].chars() {
            if !ctx.state.options.set_short(letter, enable) {
                return usage_error(ctx, SET_USAGE);
            }
        }
        i += 1;
    }

    if let Some(start) = positional {
        let params: Vec<String> = argv[start..].to_vec();
        ctx.state.set_positional_params(params);
    }

    TaskStatus::Exit(0)
}
