//! Pathname Expansion
//!
//! Replaces fields containing unquoted glob metacharacters with their
//! sorted filesystem matches. Quoted metacharacters are escaped; fields
//! with no match stay literal.

use glob::{glob_with, MatchOptions, Pattern};

use crate::ast::Word;

fn is_glob_metachar(c: char) -> bool {
    matches!(c, '*' | '?' | '[')
}

/// Build a glob pattern for a field, escaping quoted metacharacters.
/// Returns None when no unquoted metacharacter exists, in which case the
/// field is taken literally.
fn word_to_glob_pattern(word: &Word) -> Option<String> {
    let mut out = String::new();
    let mut has_metachar = false;
    collect(word, false, &mut out, &mut has_metachar);
    if has_metachar {
        Some(out)
    } else {
        None
    }
}

fn collect(word: &Word, quoted: bool, out: &mut String, has_metachar: &mut bool) {
    match word {
        Word::String(ws) => {
            let quoted = quoted || ws.single_quoted;
            for c in ws.text.chars() {
                if quoted {
                    out.push_str(&Pattern::escape(&c.to_string()));
                } else {
                    if is_glob_metachar(c) {
                        *has_metachar = true;
                    }
                    out.push(c);
                }
            }
        }
        Word::List(wl) => {
            for child in &wl.children {
                collect(child, quoted || wl.double_quoted, out, has_metachar);
            }
        }
        _ => debug_assert!(false, "pathname expansion on unexpanded word"),
    }
}

/// Expand every field: globbing fields are replaced by their matches,
/// others pass through with quote removal.
pub fn expand_pathnames(fields: &[Word]) -> Vec<String> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(pattern) = word_to_glob_pattern(field) else {
            out.push(field.str());
            continue;
        };

        let mut matches = Vec::new();
        if let Ok(paths) = glob_with(&pattern, options) {
            for path in paths.flatten() {
                matches.push(path.to_string_lossy().into_owned());
            }
        }

        if matches.is_empty() {
            // No match: the field stays literal.
            out.push(field.str());
        } else {
            out.extend(matches);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_field_passes_through() {
        let fields = [Word::new_substitution("plain")];
        assert_eq!(expand_pathnames(&fields), vec!["plain"]);
    }

    #[test]
    fn test_quoted_metachar_does_not_glob() {
        let field = Word::new_single_quoted("*");
        assert_eq!(word_to_glob_pattern(&field), None);
        assert_eq!(expand_pathnames(&[field]), vec!["*"]);
    }

    #[test]
    fn test_unmatched_pattern_stays_literal() {
        let field = Word::new_substitution("/no-such-dir-zzz/*");
        assert_eq!(expand_pathnames(&[field]), vec!["/no-such-dir-zzz/*"]);
    }

    #[test]
    fn test_glob_matches_are_sorted() {
        let field = Word::new_substitution("/dev/null*");
        let result = expand_pathnames(&[field]);
        assert!(result.contains(&"/dev/null".to_string()));
        let mut sorted = result.clone();
        sorted.sort();
        assert_eq!(result, sorted);
    }

    #[test]
    fn test_mixed_quoting() {
        // An unquoted star next to a quoted one: the field globs, the
        // quoted star matches a literal star character.
        let word = Word::new_list(
            vec![Word::new_substitution("/dev/nu"), Word::new_single_quoted("ll")],
            false,
        );
        assert_eq!(word_to_glob_pattern(&word), None);

        let word = Word::new_list(
            vec![Word::new_substitution("/dev/nu*"), Word::new_single_quoted("z")],
            false,
        );
        assert_eq!(word_to_glob_pattern(&word).unwrap(), "/dev/nu*z");
    }
}
