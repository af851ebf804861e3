//! Front-End Drivers
//!
//! The shell reads input through a blocking "produce next chunk" source
//! behind the parser's cursor. The interactive driver prints an expanded
//! `$PS1` before each complete command and keeps going after syntax
//! errors; the script driver stops at the first one. Both run the EXIT
//! trap exactly once on the way out.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::interp::{expansion, run_program};
use crate::parser::Parser;
use crate::shell::state::ShellState;
use crate::shell::trap;

fn alias_snapshot(state: &ShellState) -> HashMap<String, String> {
    state
        .aliases
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// The shell's final exit code: the planned exit, or the last command's
/// status.
fn exit_code(state: &mut ShellState) -> i32 {
    trap::run_exit_trap(state);
    state.exit.unwrap_or(state.last_status)
}

/// Run commands from a non-interactive source, line by line so aliases and
/// option changes take effect on subsequent commands. A syntax error ends
/// the shell with status 2.
pub fn run_from_parser(state: &mut ShellState, mut parser: Parser) -> i32 {
    loop {
        if state.exit.is_some() {
            break;
        }

        parser.set_aliases(alias_snapshot(state));
        parser.set_verbose(state.options.verbose);
        match parser.parse_line() {
            Ok(None) => break,
            Ok(Some(program)) => {
                if state.options.noexec {
                    continue;
                }
                run_program(state, &program);
            }
            Err(err) => {
                eprintln!("{}: {}", state.name(), err);
                state.last_status = 2;
                break;
            }
        }
    }

    exit_code(state)
}

pub fn run_string(state: &mut ShellState, source: &str) -> i32 {
    run_from_parser(state, Parser::from_str(source))
}

/// The interactive loop: prompt, parse one line, run it, recover from
/// syntax errors. EOF ends the shell unless `ignoreeof` is set.
pub fn run_interactive(state: &mut ShellState) -> i32 {
    let mut parser = Parser::from_reader(Box::new(io::stdin()));

    loop {
        if state.exit.is_some() {
            break;
        }

        let ps1 = expansion::expand_ps(state, "PS1", default_ps1());
        eprint!("{}", ps1);
        let _ = io::stderr().flush();

        parser.set_aliases(alias_snapshot(state));
        parser.set_verbose(state.options.verbose);
        match parser.parse_line() {
            Ok(None) => {
                if state.options.ignoreeof {
                    eprintln!("Use \"exit\" to leave the shell.");
                    parser = Parser::from_reader(Box::new(io::stdin()));
                    continue;
                }
                break;
            }
            Ok(Some(program)) => {
                if state.options.noexec {
                    continue;
                }
                run_program(state, &program);
            }
            Err(err) => {
                eprintln!("{}: {}", state.name(), err);
                state.last_status = 1;
            }
        }
    }

    exit_code(state)
}

fn default_ps1() -> &'static str {
    if unsafe { libc::getuid() } == 0 {
        "# "
    } else {
        "$ "
    }
}

/// Expand and source `$ENV` in interactive shells, skipped when real and
/// effective ids differ.
pub fn source_env_file(state: &mut ShellState) {
    let Some(env) = state.env_get_value("ENV").map(|s| s.to_string()) else {
        return;
    };
    unsafe {
        if libc::getuid() != libc::geteuid() || libc::getgid() != libc::getegid() {
            return;
        }
    }
    let Some(path) = expansion::expand_str(state, &env) else {
        return;
    };
    if path.is_empty() {
        return;
    }
    if !path.starts_with('/') {
        eprintln!("{}: $ENV is not an absolute path; ignoring it", state.name());
        return;
    }

    let Ok(source) = std::fs::read_to_string(&path) else {
        return;
    };
    run_script_source(state, &source);
}

fn run_script_source(state: &mut ShellState, source: &str) {
    let mut parser = Parser::from_str(source);
    loop {
        if state.exit.is_some() {
            return;
        }
        parser.set_aliases(alias_snapshot(state));
        match parser.parse_line() {
            Ok(None) => return,
            Ok(Some(program)) => {
                run_program(state, &program);
            }
            Err(err) => {
                eprintln!("{}: {}", state.name(), err);
                return;
            }
        }
    }
}

/// Read a whole script file, reporting the conventional 127 status when it
/// cannot be opened.
pub fn read_script(state: &ShellState, path: &str) -> Result<String, i32> {
    match std::fs::read_to_string(path) {
        Ok(source) => Ok(source),
        Err(err) => {
            eprintln!("{}: {}: {}", state.name(), path, err);
            Err(127)
        }
    }
}

