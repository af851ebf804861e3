//! Parameter Expansion
//!
//! Resolves `$name` and `${name<op>arg}` against the shell state: special
//! parameters, positional parameters, variables, and the POSIX operator set
//! including pattern removal. `$@` and `$*` expand to one field per
//! positional parameter; under double quotes the fields survive unsplit.

use crate::ast::{ParamOp, Word, WordParameter, WordString};
use crate::interp::expansion::{pattern, run_word};
use crate::interp::{Context, TaskStatus};
use crate::shell::VAR_ATTRIB_NONE;

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// A substitution-result string, split-eligible outside double quotes.
fn result_string(text: impl Into<String>, quoted: bool) -> Word {
    Word::String(WordString {
        text: text.into(),
        single_quoted: false,
        split_fields: !quoted,
        range: Default::default(),
    })
}

/// The separator between `$@`/`$*` fields: unconditionally split-eligible,
/// so each positional parameter lands in its own field even inside double
/// quotes.
fn field_separator() -> Word {
    Word::String(WordString {
        text: " ".to_string(),
        single_quoted: false,
        split_fields: true,
        range: Default::default(),
    })
}

/// Expand `$@`, `$*`, `"$@"` or `"$*"`.
fn expand_positional(ctx: &Context, star: bool, quoted: bool) -> Word {
    let params = ctx.state.positional_params();

    if star && quoted {
        // "$*" joins on the first IFS character into a single field.
        let sep = match ctx.state.env_get_value("IFS") {
            None => " ".to_string(),
            Some(ifs) => ifs.chars().next().map(String::from).unwrap_or_default(),
        };
        return Word::new_unsplit(params.join(&sep));
    }

    let mut children = Vec::with_capacity(params.len() * 2);
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            children.push(field_separator());
        }
        if quoted {
            children.push(Word::new_unsplit(param.clone()));
        } else {
            children.push(Word::new_substitution(param.clone()));
        }
    }
    Word::new_list(children, false)
}

/// Look up a parameter's value. `None` means unset.
fn parameter_get_value(ctx: &Context, wp: &WordParameter) -> Option<String> {
    let state = &ctx.state;
    let name = wp.name.as_str();
    match name {
        "#" => return Some(state.positional_params().len().to_string()),
        "?" => return Some(state.last_status.to_string()),
        "-" => return Some(state.options.short_string(state.interactive)),
        "$" => return Some(state.shell_pid.to_string()),
        "!" => return Some(state.last_bg_pid.to_string()),
        _ => {}
    }

    if name.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = name.parse().ok()?;
        let frame = state.frame();
        return frame.argv.get(n).cloned();
    }

    if let Some(value) = state.env_get_value(name) {
        return Some(value.to_string());
    }

    // The current source line of the expanding word.
    if name == "LINENO" {
        let line = wp.name_range.begin.line.max(1);
        return Some(line.to_string());
    }

    None
}

/// Expand the operator argument word, preserving its quoting structure.
fn expand_arg(
    ctx: &mut Context,
    wp: &WordParameter,
    quoted: bool,
) -> Result<Word, TaskStatus> {
    let mut arg = match &wp.arg {
        Some(arg) => (**arg).clone(),
        None => Word::new_string(""),
    };
    run_word(ctx, &mut arg, quoted)?;
    Ok(arg)
}

fn unset_error(ctx: &mut Context, name: &str, message: &str) -> TaskStatus {
    eprintln!("{}: {}: {}", ctx.state.name(), name, message);
    if !ctx.state.interactive {
        ctx.state.exit = Some(1);
    }
    TaskStatus::Error
}

/// Resolve a parameter word to its replacement.
pub(crate) fn run_parameter(
    ctx: &mut Context,
    wp: &WordParameter,
    quoted: bool,
) -> Result<Word, TaskStatus> {
    if wp.name == "@" || wp.name == "*" {
        if wp.op == ParamOp::LeadingHash {
            eprintln!(
                "{}: using the string length operator on ${} is undefined behaviour",
                ctx.state.name(),
                wp.name
            );
            return Err(TaskStatus::Error);
        }
        if wp.op != ParamOp::None {
            eprintln!("{}: ${{{}{}...}}: bad substitution",
                ctx.state.name(), wp.name, wp.op.as_str());
            return Err(TaskStatus::Error);
        }
        return Ok(expand_positional(ctx, wp.name == "*", quoted));
    }

    let value = parameter_get_value(ctx, wp);
    let missing = match &value {
        None => true,
        Some(value) => value.is_empty() && wp.colon,
    };

    match wp.op {
        ParamOp::None => {}
        ParamOp::Minus => {
            // Use default value.
            if missing {
                return expand_arg(ctx, wp, quoted);
            }
            return Ok(result_string(value.unwrap(), quoted));
        }
        ParamOp::Equal => {
            // Assign default value.
            if missing {
                if !wp.name.chars().next().map(is_name_start).unwrap_or(false) {
                    eprintln!(
                        "{}: {}: cannot assign in this way",
                        ctx.state.name(),
                        wp.name
                    );
                    return Err(TaskStatus::Error);
                }
                let default = expand_arg(ctx, wp, quoted)?.str();
                if ctx.state.env_set(&wp.name, &default, VAR_ATTRIB_NONE).is_err() {
                    eprintln!(
                        "{}: cannot modify readonly variable {}",
                        ctx.state.name(),
                        wp.name
                    );
                    return Err(TaskStatus::Error);
                }
                return Ok(result_string(default, quoted));
            }
            return Ok(result_string(value.unwrap(), quoted));
        }
        ParamOp::QMark => {
            // Indicate error if null or unset.
            if missing {
                let message = match &wp.arg {
                    Some(_) => expand_arg(ctx, wp, quoted)?.str(),
                    None => {
                        if value.is_none() {
                            "parameter not set".to_string()
                        } else {
                            "parameter null or not set".to_string()
                        }
                    }
                };
                return Err(unset_error(ctx, &wp.name, &message));
            }
            return Ok(result_string(value.unwrap(), quoted));
        }
        ParamOp::Plus => {
            // Use alternative value.
            if missing {
                return Ok(result_string("", quoted));
            }
            return expand_arg(ctx, wp, quoted);
        }
        ParamOp::Percent | ParamOp::DPercent | ParamOp::Hash | ParamOp::DHash => {
            if value.is_none() && ctx.state.options.nounset {
                return Err(unset_error(ctx, &wp.name, "unbound variable"));
            }
            let subject = value.unwrap_or_default();
            let arg = expand_arg(ctx, wp, quoted)?;
            let pat = pattern::word_to_regex_pattern(&arg);
            let stripped = match wp.op {
                ParamOp::Percent => pattern::remove_smallest_suffix(&subject, &pat),
                ParamOp::DPercent => pattern::remove_largest_suffix(&subject, &pat),
                ParamOp::Hash => pattern::remove_smallest_prefix(&subject, &pat),
                ParamOp::DHash => pattern::remove_largest_prefix(&subject, &pat),
                _ => unreachable!(),
            };
            return Ok(result_string(stripped, quoted));
        }
        ParamOp::LeadingHash => {
            // String length.
            if value.is_none() && ctx.state.options.nounset {
                return Err(unset_error(ctx, &wp.name, "unbound variable"));
            }
            let len = value.map(|v| v.chars().count()).unwrap_or(0);
            return Ok(result_string(len.to_string(), quoted));
        }
    }

    match value {
        Some(value) => Ok(result_string(value, quoted)),
        None => {
            if ctx.state.options.nounset {
                return Err(unset_error(ctx, &wp.name, "unbound variable"));
            }
            Ok(result_string("", quoted))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{ShellState, VAR_ATTRIB_NONE};

    fn state() -> ShellState {
        ShellState::new(vec!["test-sh".to_string()])
    }

    fn expand(state: &mut ShellState, src: &str) -> Result<String, TaskStatus> {
        let mut parser = crate::parser::Parser::from_str(src);
        let mut word = parser.word(0).expect("parse word");
        let mut ctx = Context::new(state);
        match run_word(&mut ctx, &mut word, false) {
            Ok(()) => Ok(word.str()),
            Err(status) => Err(status),
        }
    }

    #[test]
    fn test_plain_lookup() {
        let mut state = state();
        state.env_set("X", "val", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "$X").unwrap(), "val");
        assert_eq!(expand(&mut state, "${X}").unwrap(), "val");
        assert_eq!(expand(&mut state, "$Y").unwrap(), "");
    }

    #[test]
    fn test_default_value() {
        let mut state = state();
        assert_eq!(expand(&mut state, "${X:-def}").unwrap(), "def");
        state.env_set("X", "", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${X:-def}").unwrap(), "def");
        assert_eq!(expand(&mut state, "${X-def}").unwrap(), "");
        state.env_set("X", "set", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${X:-def}").unwrap(), "set");
    }

    #[test]
    fn test_assign_default() {
        let mut state = state();
        assert_eq!(expand(&mut state, "${X:=new}").unwrap(), "new");
        assert_eq!(state.env_get_value("X"), Some("new"));
        assert_eq!(expand(&mut state, "${X:=other}").unwrap(), "new");
    }

    #[test]
    fn test_alternative_value() {
        let mut state = state();
        assert_eq!(expand(&mut state, "${X:+alt}").unwrap(), "");
        state.env_set("X", "v", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${X:+alt}").unwrap(), "alt");
        state.env_set("Y", "", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${Y+alt}").unwrap(), "alt");
        assert_eq!(expand(&mut state, "${Y:+alt}").unwrap(), "");
    }

    #[test]
    fn test_error_if_unset() {
        let mut state = state();
        state.interactive = true;
        assert!(expand(&mut state, "${X:?missing}").is_err());

        state.env_set("X", "ok", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${X:?missing}").unwrap(), "ok");
    }

    #[test]
    fn test_error_if_unset_plans_exit_when_not_interactive() {
        let mut state = state();
        assert!(expand(&mut state, "${X?}").is_err());
        assert_eq!(state.exit, Some(1));
    }

    #[test]
    fn test_length() {
        let mut state = state();
        state.env_set("X", "hello", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${#X}").unwrap(), "5");
        assert_eq!(expand(&mut state, "${#Y}").unwrap(), "0");
    }

    #[test]
    fn test_pattern_removal() {
        let mut state = state();
        state.env_set("X", "a.b.c", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${X%.*}").unwrap(), "a.b");
        assert_eq!(expand(&mut state, "${X%%.*}").unwrap(), "a");
        assert_eq!(expand(&mut state, "${X#*.}").unwrap(), "b.c");
        assert_eq!(expand(&mut state, "${X##*.}").unwrap(), "c");
        // No match leaves the value alone.
        assert_eq!(expand(&mut state, "${X%q*z}").unwrap(), "a.b.c");
    }

    #[test]
    fn test_quoted_pattern_is_literal() {
        let mut state = state();
        state.env_set("X", "hello*", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand(&mut state, "${X%'*'}").unwrap(), "hello");
    }

    #[test]
    fn test_special_parameters() {
        let mut state = state();
        state.last_status = 42;
        assert_eq!(expand(&mut state, "$?").unwrap(), "42");
        assert_eq!(expand(&mut state, "$#").unwrap(), "0");
        assert_eq!(expand(&mut state, "$!").unwrap(), "0");
        assert_eq!(expand(&mut state, "$0").unwrap(), "test-sh");

        state.set_positional_params(vec!["one".into(), "two".into()]);
        assert_eq!(expand(&mut state, "$1").unwrap(), "one");
        assert_eq!(expand(&mut state, "$2").unwrap(), "two");
        assert_eq!(expand(&mut state, "$3").unwrap(), "");
        assert_eq!(expand(&mut state, "$#").unwrap(), "2");
    }

    #[test]
    fn test_nounset() {
        let mut state = state();
        state.options.nounset = true;
        state.interactive = true;
        assert!(expand(&mut state, "$NOPE").is_err());
        // Defaults still apply under nounset.
        assert_eq!(expand(&mut state, "${NOPE:-ok}").unwrap(), "ok");
    }

    #[test]
    fn test_lineno() {
        let mut state = state();
        assert_eq!(expand(&mut state, "$LINENO").unwrap(), "1");
    }
}
