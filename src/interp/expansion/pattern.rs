//! Shell Pattern Matching
//!
//! Converts shell glob patterns (POSIX §2.13) to regexes for case-clause
//! matching and the `%`/`%%`/`#`/`##` parameter operators. Quoted pattern
//! characters arrive backslash-escaped from `word_to_regex_pattern` and
//! match literally. Smallest/largest removal scans match positions with a
//! full-match regex, so quantifier greediness never matters.

use regex_lite::Regex;

use crate::ast::Word;

fn is_pattern_metachar(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']' | '\\')
}

/// Flatten an expanded word into a pattern string, backslash-escaping the
/// characters that were quoted so they match literally.
pub fn word_to_regex_pattern(word: &Word) -> String {
    let mut out = String::new();
    collect_pattern(word, false, &mut out);
    out
}

fn collect_pattern(word: &Word, quoted: bool, out: &mut String) {
    match word {
        Word::String(ws) => {
            for c in ws.text.chars() {
                if (quoted || ws.single_quoted) && is_pattern_metachar(c) {
                    out.push('\\');
                }
                out.push(c);
            }
        }
        Word::List(wl) => {
            for child in &wl.children {
                collect_pattern(child, quoted || wl.double_quoted, out);
            }
        }
        _ => debug_assert!(false, "pattern from unexpanded word"),
    }
}

fn push_regex_literal(out: &mut String, c: char) {
    if matches!(
        c,
        '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    ) {
        out.push('\\');
    }
    out.push(c);
}

/// Convert a shell pattern to a regex fragment.
pub fn pattern_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                // Quoted pattern character: literal.
                if i + 1 < chars.len() {
                    push_regex_literal(&mut out, chars[i + 1]);
                    i += 2;
                } else {
                    out.push_str("\\\\");
                    i += 1;
                }
            }
            '*' => {
                out.push_str(".*");
                i += 1;
            }
            '?' => {
                out.push('.');
                i += 1;
            }
            '[' => {
                // Bracket expression. An unclosed bracket is a literal.
                match convert_bracket(&chars, i) {
                    Some((class, next)) => {
                        out.push_str(&class);
                        i = next;
                    }
                    None => {
                        out.push_str("\\[");
                        i += 1;
                    }
                }
            }
            other => {
                push_regex_literal(&mut out, other);
                i += 1;
            }
        }
    }

    out
}

/// Convert `[...]` starting at `start`. Returns the regex class and the
/// index after the closing bracket.
fn convert_bracket(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start + 1;
    let mut class = String::from("[");

    if chars.get(i) == Some(&'!') {
        class.push('^');
        i += 1;
    }
    // A `]` directly after the (possibly negated) opening bracket is a
    // literal member.
    if chars.get(i) == Some(&']') {
        class.push_str("\\]");
        i += 1;
    }

    let mut closed = false;
    while i < chars.len() {
        let c = chars[i];
        if c == ']' {
            closed = true;
            i += 1;
            break;
        }
        if matches!(c, '\\' | '[' | '^') {
            class.push('\\');
        }
        class.push(c);
        i += 1;
    }
    if !closed {
        return None;
    }

    class.push(']');
    Some((class, i))
}

fn full_match_regex(pattern: &str) -> Option<Regex> {
    Regex::new(&format!("^(?s:{})$", pattern_to_regex(pattern))).ok()
}

/// Glob-style match of a whole subject string, as used by `case`.
pub fn pattern_matches(pattern: &str, subject: &str) -> bool {
    match full_match_regex(pattern) {
        Some(regex) => regex.is_match(subject),
        None => false,
    }
}

/// Char-boundary offsets of `value`, in ascending order, including the end.
fn boundaries(value: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = value.char_indices().map(|(i, _)| i).collect();
    offsets.push(value.len());
    offsets
}

/// `${x%pattern}`: remove the smallest matching suffix.
pub fn remove_smallest_suffix(value: &str, pattern: &str) -> String {
    let Some(regex) = full_match_regex(pattern) else {
        return value.to_string();
    };
    for &i in boundaries(value).iter().rev() {
        if regex.is_match(&value[i..]) {
            return value[..i].to_string();
        }
    }
    value.to_string()
}

/// `${x%%pattern}`: remove the largest matching suffix.
pub fn remove_largest_suffix(value: &str, pattern: &str) -> String {
    let Some(regex) = full_match_regex(pattern) else {
        return value.to_string();
    };
    for &i in boundaries(value).iter() {
        if regex.is_match(&value[i..]) {
            return value[..i].to_string();
        }
    }
    value.to_string()
}

/// `${x#pattern}`: remove the smallest matching prefix.
pub fn remove_smallest_prefix(value: &str, pattern: &str) -> String {
    let Some(regex) = full_match_regex(pattern) else {
        return value.to_string();
    };
    for &i in boundaries(value).iter() {
        if regex.is_match(&value[..i]) {
            return value[i..].to_string();
        }
    }
    value.to_string()
}

/// `${x##pattern}`: remove the largest matching prefix.
pub fn remove_largest_prefix(value: &str, pattern: &str) -> String {
    let Some(regex) = full_match_regex(pattern) else {
        return value.to_string();
    };
    for &i in boundaries(value).iter().rev() {
        if regex.is_match(&value[..i]) {
            return value[i..].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(pattern_matches("abc", "abc"));
        assert!(!pattern_matches("abc", "abd"));
    }

    #[test]
    fn test_star_and_question() {
        assert!(pattern_matches("a*c", "abbbc"));
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("a?c", "abc"));
        assert!(!pattern_matches("a?c", "ac"));
    }

    #[test]
    fn test_bracket_expressions() {
        assert!(pattern_matches("[abc]", "b"));
        assert!(!pattern_matches("[abc]", "d"));
        assert!(pattern_matches("[a-z]x", "qx"));
        assert!(pattern_matches("[!a]", "b"));
        assert!(!pattern_matches("[!a]", "a"));
        assert!(pattern_matches("[]x]", "]"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        assert!(pattern_matches("a[b", "a[b"));
    }

    #[test]
    fn test_escaped_metachar_is_literal() {
        assert!(pattern_matches("a\\*b", "a*b"));
        assert!(!pattern_matches("a\\*b", "axb"));
    }

    #[test]
    fn test_regex_specials_in_subject() {
        assert!(pattern_matches("a.c", "a.c"));
        assert!(!pattern_matches("a.c", "abc"));
        assert!(pattern_matches("x(*)y", "x(z)y"));
    }

    #[test]
    fn test_suffix_removal() {
        assert_eq!(remove_smallest_suffix("a.b.c", ".*"), "a.b");
        assert_eq!(remove_largest_suffix("a.b.c", ".*"), "a");
        assert_eq!(remove_smallest_suffix("abc", "z*"), "abc");
        // An empty pattern removes an empty suffix.
        assert_eq!(remove_smallest_suffix("abc", ""), "abc");
    }

    #[test]
    fn test_prefix_removal() {
        assert_eq!(remove_smallest_prefix("a.b.c", "*."), "b.c");
        assert_eq!(remove_largest_prefix("a.b.c", "*."), "c");
        assert_eq!(remove_smallest_prefix("abc", "z*"), "abc");
    }

    #[test]
    fn test_word_to_regex_pattern_quoting() {
        let word = Word::new_list(
            vec![Word::new_string("a"), Word::new_single_quoted("*")],
            false,
        );
        assert_eq!(word_to_regex_pattern(&word), "a\\*");
    }
}
