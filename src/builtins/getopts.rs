//! `getopts`: parse positional parameters as options, one call per option,
//! driving `$OPTIND` and `$OPTARG`.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::state::VAR_ATTRIB_NONE;

/// State carried between calls inside OPTIND: "index" or "index:offset"
/// when in the middle of a clustered option group.
fn parse_optind(value: &str) -> (usize, usize) {
    match value.split_once(':') {
        Some((index, offset)) => (
            index.parse().unwrap_or(1),
            offset.parse().unwrap_or(0),
        ),
        None => (value.parse().unwrap_or(1), 0),
    }
}

fn store_optind(ctx: &mut Context, index: usize, offset: usize) {
    let value = if offset == 0 {
        index.to_string()
    } else {
        format!("{}:{}", index, offset)
    };
    let _ = ctx.state.env_set("OPTIND", &value, VAR_ATTRIB_NONE);
}

fn finish(ctx: &mut Context, name: &str, index: usize) -> TaskStatus {
    store_optind(ctx, index, 0);
    let _ = ctx.state.env_set(name, "?", VAR_ATTRIB_NONE);
    TaskStatus::Exit(1)
}

pub fn builtin_getopts(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    if argv.len() < 3 {
        return usage_error(ctx, "getopts optstring name [arg...]");
    }
    let optstring = &argv[1];
    let name = argv[2].clone();
    let silent = optstring.starts_with(':');

    let args: Vec<String> = if argv.len() > 3 {
        argv[3..].to_vec()
    } else {
        ctx.state.positional_params().to_vec()
    };

    let optind = ctx.state.env_get_value("OPTIND").unwrap_or("1").to_string();
    let (mut index, mut offset) = parse_optind(&optind);

    // OPTIND is 1-based over the argument list.
    loop {
        let Some(arg) = args.get(index.wrapping_sub(1)) else {
            return finish(ctx, &name, index);
        };

        if offset == 0 {
            if arg == "--" {
                return finish(ctx, &name, index + 1);
            }
            if !arg.starts_with('-') || arg == "-" {
                return finish(ctx, &name, index);
            }
            offset = 1;
        }

        let Some(opt) = arg.chars().nth(offset) else {
            index += 1;
            offset = 0;
            continue;
        };

        let wants_arg = optstring
            .char_indices()
            .any(|(i, c)| c == opt && optstring[i + 1..].starts_with(':'));
        let known = opt != ':' && optstring.chars().any(|c| c == opt);

        let at_end = arg.chars().nth(offset + 1).is_none();

        if !known {
            // Unknown option.
            if silent {
                let _ = ctx.state.env_set("OPTARG", &opt.to_string(), VAR_ATTRIB_NONE);
            } else {
                eprintln!("{}: getopts: unknown option -{}", ctx.state.name(), opt);
                let _ = ctx.state.env_unset("OPTARG");
            }
            let _ = ctx.state.env_set(&name, "?", VAR_ATTRIB_NONE);
            if at_end {
                store_optind(ctx, index + 1, 0);
            } else {
                store_optind(ctx, index, offset + 1);
            }
            return TaskStatus::Exit(0);
        }

        if wants_arg {
            let optarg = if !at_end {
                Some(arg.chars().skip(offset + 1).collect::<String>())
            } else {
                args.get(index).cloned()
            };
            let (next_index, value) = match optarg {
                Some(value) => (if at_end { index + 2 } else { index + 1 }, value),
                None => {
                    // Missing option argument.
                    if silent {
                        let _ = ctx.state.env_set(&name, ":", VAR_ATTRIB_NONE);
                        let _ =
                            ctx.state.env_set("OPTARG", &opt.to_string(), VAR_ATTRIB_NONE);
                    } else {
                        eprintln!(
                            "{}: getopts: option -{} requires an argument",
                            ctx.state.name(),
                            opt
                        );
                        let _ = ctx.state.env_set(&name, "?", VAR_ATTRIB_NONE);
                        let _ = ctx.state.env_unset("OPTARG");
                    }
                    store_optind(ctx, index + 1, 0);
                    return TaskStatus::Exit(0);
                }
            };
            let _ = ctx.state.env_set(&name, &opt.to_string(), VAR_ATTRIB_NONE);
            let _ = ctx.state.env_set("OPTARG", &value, VAR_ATTRIB_NONE);
            store_optind(ctx, next_index, 0);
            return TaskStatus::Exit(0);
        }

        let _ = ctx.state.env_set(&name, &opt.to_string(), VAR_ATTRIB_NONE);
        let _ = ctx.state.env_unset("OPTARG");
        if at_end {
            store_optind(ctx, index + 1, 0);
        } else {
            store_optind(ctx, index, offset + 1);
        }
        return TaskStatus::Exit(0);
    }
}
