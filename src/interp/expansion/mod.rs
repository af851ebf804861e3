//! Expansion Engine
//!
//! Mutates word trees in place, in POSIX order: tilde expansion, parameter
//! expansion, command substitution, arithmetic expansion, then field
//! splitting and pathname expansion on the result. Quote removal is
//! implicit: quote markers only steer the phases and are not part of the
//! final value. After `run_word` a tree contains only strings and quoted
//! lists.

pub mod arithmetic;
pub mod command_subst;
pub mod field_split;
pub mod parameter;
pub mod pathname;
pub mod pattern;
pub mod tilde;

use crate::ast::Word;
use crate::interp::task::TaskWord;
use crate::interp::{Context, TaskStatus};
use crate::parser::Parser;
use crate::shell::state::ShellState;

/// Where tilde expansion applies: command-word position, assignment values
/// (which re-expand after each unquoted `:`), or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TildeMode {
    None,
    Name,
    Assignment,
}

/// Perform all substitutions on a word. `quoted` is true inside a
/// double-quoted list; substitution results there are not field-split
/// later.
pub(crate) fn run_word(
    ctx: &mut Context,
    word: &mut Word,
    quoted: bool,
) -> Result<(), TaskStatus> {
    match word {
        Word::String(_) => Ok(()),
        Word::Parameter(wp) => {
            let replacement = parameter::run_parameter(ctx, wp, quoted)?;
            *word = replacement;
            Ok(())
        }
        Word::Command(wc) => {
            let (text, status) = command_subst::run_word_command(ctx, wc)?;
            ctx.last_cmdsubst_status = Some(status);
            *word = if quoted {
                Word::new_unsplit(text)
            } else {
                Word::new_substitution(text)
            };
            Ok(())
        }
        Word::Arithmetic(wa) => {
            let text = arithmetic::run_word_arithmetic(ctx, wa)?;
            *word = if quoted {
                Word::new_unsplit(text)
            } else {
                Word::new_substitution(text)
            };
            Ok(())
        }
        Word::List(wl) => {
            let quoted = quoted || wl.double_quoted;
            for child in &mut wl.children {
                run_word(ctx, child, quoted)?;
            }
            Ok(())
        }
    }
}

/// Expand a word in place: tilde expansion followed by all substitutions.
pub(crate) fn expand_word_in_place(
    ctx: &mut Context,
    word: &mut Word,
    tilde: TildeMode,
) -> Result<(), TaskStatus> {
    if tilde != TildeMode::None {
        tilde::expand_tilde(ctx.state, word, tilde == TildeMode::Assignment);
    }
    run_word(ctx, word, false)
}

/// Expand a word to a single string: substitutions and quote removal, no
/// field splitting. Used for redirection targets, case subjects, and
/// assignment values.
pub fn expand_to_string(
    ctx: &mut Context,
    word: &Word,
    tilde: TildeMode,
) -> Result<String, TaskStatus> {
    let mut word = word.clone();
    expand_word_in_place(ctx, &mut word, tilde)?;
    Ok(word.str())
}

/// Expand a word all the way to fields: substitutions, field splitting on
/// `$IFS`, and pathname expansion (unless `noglob`).
pub fn expand_to_fields(
    ctx: &mut Context,
    word: &Word,
    tilde: TildeMode,
) -> Result<Vec<String>, TaskStatus> {
    let mut word = word.clone();
    expand_word_in_place(ctx, &mut word, tilde)?;

    let ifs = ctx.state.env_get_value("IFS").map(|s| s.to_string());
    let fields = field_split::split_fields(&word, ifs.as_deref());

    if ctx.state.options.noglob {
        Ok(fields.iter().map(|field| field.str()).collect())
    } else {
        Ok(pathname::expand_pathnames(&fields))
    }
}

/// Expand a string containing substitutions, as used for `$ENV` and the
/// prompt variables.
pub fn expand_str(state: &mut ShellState, text: &str) -> Option<String> {
    let mut parser = Parser::from_str(text);
    let word = parser.parse_word_string()?;
    if parser.error().is_some() {
        return None;
    }

    use crate::interp::task::TaskImpl as _;
    let mut task = TaskWord::new(word, TildeMode::Name);
    let mut ctx = Context::new(state);
    match task.poll(&mut ctx) {
        TaskStatus::Exit(0) => Some(task.into_word().str()),
        _ => None,
    }
}

/// Expand a PSn prompt variable, falling back to a default on failure.
pub fn expand_ps(state: &mut ShellState, name: &str, default: &str) -> String {
    let Some(ps) = state.env_get_value(name).map(|s| s.to_string()) else {
        return default.to_string();
    };
    if ps.is_empty() {
        return String::new();
    }
    expand_str(state, &ps).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::VAR_ATTRIB_NONE;

    fn state() -> ShellState {
        let mut state = ShellState::new(vec!["test-sh".to_string()]);
        state.child = true;
        state
    }

    #[test]
    fn test_expanding_expanded_word_is_noop() {
        let mut state = state();
        let mut word = Word::new_list(
            vec![
                Word::new_single_quoted("a b"),
                Word::new_list(vec![Word::new_unsplit("c$d")], true),
            ],
            false,
        );
        let before = word.clone();
        let mut ctx = Context::new(&mut state);
        run_word(&mut ctx, &mut word, false).unwrap();
        assert_eq!(word, before);
    }

    #[test]
    fn test_expand_str() {
        let mut state = state();
        state.env_set("X", "mid", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand_str(&mut state, "a $X z").unwrap(), "a mid z");
        assert_eq!(expand_str(&mut state, "plain").unwrap(), "plain");
    }

    #[test]
    fn test_expand_ps_defaults() {
        let mut state = state();
        assert_eq!(expand_ps(&mut state, "PS4", "+ "), "+ ");
        state.env_set("PS4", "trace> ", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(expand_ps(&mut state, "PS4", "+ "), "trace> ");
    }

    #[test]
    fn test_expand_to_string_removes_quotes() {
        let mut state = state();
        let mut parser = crate::parser::Parser::from_str("'a  b'\"c\"");
        let word = parser.word(0).unwrap();
        let mut ctx = Context::new(&mut state);
        assert_eq!(
            expand_to_string(&mut ctx, &word, TildeMode::Name).unwrap(),
            "a  bc"
        );
    }

    #[test]
    fn test_expand_to_fields_splits_substitutions_only() {
        let mut state = state();
        state.env_set("V", "x y", VAR_ATTRIB_NONE).unwrap();
        let mut parser = crate::parser::Parser::from_str("$V a'b c'");
        let word = parser.word(0).unwrap();
        let mut ctx = Context::new(&mut state);
        let fields = expand_to_fields(&mut ctx, &word, TildeMode::Name).unwrap();
        assert_eq!(fields, vec!["x", "y"]);

        let mut parser = crate::parser::Parser::from_str("a'b c'");
        let word = parser.word(0).unwrap();
        let mut ctx = Context::new(&mut state);
        let fields = expand_to_fields(&mut ctx, &word, TildeMode::Name).unwrap();
        assert_eq!(fields, vec!["ab c"]);
    }
}
