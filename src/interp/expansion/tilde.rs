//! Tilde Expansion
//!
//! Replaces a leading unquoted `~` or `~user` with a home directory,
//! terminated by `/` or the end of the word (POSIX §2.6.1). In assignment
//! values the expansion repeats after each unquoted colon. Runs before any
//! substitution; quoted text is never touched.

use crate::ast::{Word, WordString};
use crate::shell::os;
use crate::shell::state::ShellState;

/// See POSIX §3.282: characters allowed in a login name.
fn is_logname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Find a tilde prefix at the start of `str`. Returns the home directory
/// and the prefix length. `last` is false when more word text follows in a
/// sibling child, in which case a bare `~` with no terminating slash does
/// not expand.
fn expand_tilde_at(state: &ShellState, str: &str, last: bool) -> Option<(String, usize)> {
    if !str.starts_with('~') {
        return None;
    }

    let rest = &str[1..];
    let slash = rest.find('/').unwrap_or(rest.len());
    let name = &rest[..slash];
    if !name.chars().all(is_logname_char) {
        return None;
    }
    if slash == rest.len() && !last {
        return None;
    }

    let dir = if name.is_empty() {
        state.env_get_value("HOME").map(|s| s.to_string())
    } else {
        os::getpwnam_dir(name)
    }?;

    Some((dir, 1 + slash))
}

fn expand_in_string(
    state: &ShellState,
    ws: &WordString,
    assignment: bool,
    first: bool,
    last: bool,
) -> Option<Word> {
    if ws.single_quoted {
        return None;
    }

    let mut children = Vec::new();
    let mut str = ws.text.as_str();

    if first {
        if let Some((dir, offset)) = expand_tilde_at(state, str, last) {
            children.push(Word::new_single_quoted(dir));
            str = &str[offset..];
        }
    }

    if assignment {
        while let Some(colon) = str.find(':') {
            children.push(Word::new_string(&str[..colon + 1]));
            str = &str[colon + 1..];
            if let Some((dir, offset)) = expand_tilde_at(state, str, last) {
                children.push(Word::new_single_quoted(dir));
                str = &str[offset..];
            }
        }
    }

    if children.is_empty() {
        return None;
    }

    children.push(Word::new_string(str));
    Some(Word::new_list(children, false))
}

/// Apply tilde expansion to a word in place. `assignment` selects the
/// assignment-value rules.
pub fn expand_tilde(state: &ShellState, word: &mut Word, assignment: bool) {
    expand(state, word, assignment, true, true);
}

fn expand(state: &ShellState, word: &mut Word, assignment: bool, first: bool, last: bool) {
    match word {
        Word::String(ws) => {
            if let Some(replacement) = expand_in_string(state, ws, assignment, first, last)
            {
                *word = replacement;
            }
        }
        Word::List(wl) => {
            if wl.double_quoted {
                return;
            }
            let len = wl.children.len();
            for (i, child) in wl.children.iter_mut().enumerate() {
                expand(state, child, assignment, first && i == 0, last && i + 1 == len);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::VAR_ATTRIB_NONE;

    fn state_with_home(home: &str) -> ShellState {
        let mut state = ShellState::new(vec!["test-sh".to_string()]);
        state.env_set("HOME", home, VAR_ATTRIB_NONE).unwrap();
        state
    }

    fn expand_str_word(state: &ShellState, text: &str, assignment: bool) -> String {
        let mut word = Word::new_string(text);
        expand_tilde(state, &mut word, assignment);
        word.str()
    }

    #[test]
    fn test_bare_tilde() {
        let state = state_with_home("/home/me");
        assert_eq!(expand_str_word(&state, "~", false), "/home/me");
        assert_eq!(expand_str_word(&state, "~/docs", false), "/home/me/docs");
    }

    #[test]
    fn test_tilde_not_leading() {
        let state = state_with_home("/home/me");
        assert_eq!(expand_str_word(&state, "a~/b", false), "a~/b");
    }

    #[test]
    fn test_unknown_user_stays_literal() {
        let state = state_with_home("/home/me");
        assert_eq!(
            expand_str_word(&state, "~no-such-user-zz/x", false),
            "~no-such-user-zz/x"
        );
    }

    #[test]
    fn test_assignment_colons() {
        let state = state_with_home("/home/me");
        assert_eq!(
            expand_str_word(&state, "~/a:~/b", true),
            "/home/me/a:/home/me/b"
        );
        assert_eq!(expand_str_word(&state, "x:~", true), "x:/home/me");
    }

    #[test]
    fn test_no_expansion_without_home() {
        let state = ShellState::new(vec!["test-sh".to_string()]);
        assert_eq!(expand_str_word(&state, "~", false), "~");
    }

    #[test]
    fn test_single_quoted_untouched() {
        let state = state_with_home("/home/me");
        let mut word = Word::new_single_quoted("~");
        expand_tilde(&state, &mut word, false);
        assert_eq!(word.str(), "~");
    }

    #[test]
    fn test_expanded_home_is_quoted() {
        // The substituted directory must not undergo field splitting or
        // globbing, so it lands as a quoted string.
        let state = state_with_home("/home/my docs");
        let mut word = Word::new_string("~/x");
        expand_tilde(&state, &mut word, false);
        match &word {
            Word::List(wl) => match &wl.children[0] {
                Word::String(ws) => assert!(ws.single_quoted),
                other => panic!("expected string, got {:?}", other),
            },
            other => panic!("expected list, got {:?}", other),
        }
    }
}
