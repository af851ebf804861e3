//! Field Splitting
//!
//! Partitions an expanded word into fields guided by `$IFS` (POSIX §2.6.5).
//! Whitespace IFS characters collapse and never produce empty fields;
//! non-whitespace IFS characters always delimit. Only split-eligible
//! strings (substitution results outside double quotes) are scanned;
//! everything else is glue that joins the current field. Inside a
//! double-quoted list the only split-eligible strings are the separators
//! synthesized by `$@`, which delimit unconditionally.

use std::collections::HashSet;

use crate::ast::Word;

pub const DEFAULT_IFS: &str = " \t\n";

struct Splitter {
    fields: Vec<Vec<Word>>,
    cur: Option<Vec<Word>>,
    whitespace: HashSet<char>,
    non_space: HashSet<char>,
    in_ifs: bool,
    in_ifs_non_space: bool,
}

impl Splitter {
    fn add_glue(&mut self, word: Word) {
        self.cur.get_or_insert_with(Vec::new).push(word);
        self.in_ifs = false;
        self.in_ifs_non_space = false;
    }

    fn close_field(&mut self) {
        if let Some(children) = self.cur.take() {
            self.fields.push(children);
        }
    }

    fn push_empty_field(&mut self) {
        debug_assert!(self.cur.is_none());
        self.fields.push(vec![Word::new_unsplit("")]);
    }

    /// Scan one split-eligible string with the IFS rules.
    fn split_string(&mut self, text: &str) {
        let mut buf = String::new();
        for c in text.chars() {
            if !self.whitespace.contains(&c) && !self.non_space.contains(&c) {
                buf.push(c);
                self.in_ifs = false;
                self.in_ifs_non_space = false;
                continue;
            }

            let non_space = self.non_space.contains(&c);
            if !self.in_ifs {
                if !buf.is_empty() {
                    self.add_glue(Word::new_unsplit(std::mem::take(&mut buf)));
                }
                self.close_field();
                self.in_ifs = true;
                self.in_ifs_non_space = non_space;
            } else if non_space {
                if self.in_ifs_non_space {
                    self.push_empty_field();
                } else {
                    self.in_ifs_non_space = true;
                }
            }
        }

        if !buf.is_empty() {
            self.add_glue(Word::new_unsplit(buf));
        }
    }

    fn walk(&mut self, word: &Word, double_quoted: bool) {
        match word {
            Word::String(ws) => {
                if double_quoted {
                    if ws.split_fields {
                        // A `$@` separator: unconditional field break.
                        self.close_field();
                        self.in_ifs = true;
                        self.in_ifs_non_space = false;
                    } else {
                        self.add_glue(word.clone());
                    }
                    return;
                }
                if ws.single_quoted || !ws.split_fields {
                    self.add_glue(word.clone());
                    return;
                }
                self.split_string(&ws.text);
            }
            Word::List(wl) => {
                if wl.double_quoted && wl.children.is_empty() {
                    // An empty quoted string still produces a field.
                    self.add_glue(Word::new_unsplit(""));
                    return;
                }
                for child in &wl.children {
                    self.walk(child, double_quoted || wl.double_quoted);
                }
            }
            Word::Parameter(_) | Word::Command(_) | Word::Arithmetic(_) => {
                debug_assert!(false, "field splitting on unexpanded word");
            }
        }
    }
}

/// Split an expanded word into fields. `None` IFS uses the default; an
/// empty IFS disables splitting entirely.
pub fn split_fields(word: &Word, ifs: Option<&str>) -> Vec<Word> {
    let ifs = ifs.unwrap_or(DEFAULT_IFS);
    if ifs.is_empty() {
        return vec![word.clone()];
    }

    let mut whitespace = HashSet::new();
    let mut non_space = HashSet::new();
    for c in ifs.chars() {
        if matches!(c, ' ' | '\t' | '\n') {
            whitespace.insert(c);
        } else {
            non_space.insert(c);
        }
    }

    let mut splitter = Splitter {
        fields: Vec::new(),
        cur: None,
        whitespace,
        non_space,
        in_ifs: true,
        // A leading non-whitespace delimiter produces an empty first field.
        in_ifs_non_space: true,
    };
    splitter.walk(word, false);
    splitter.close_field();

    splitter
        .fields
        .into_iter()
        .map(|children| Word::new_list(children, false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(fields: &[Word]) -> Vec<String> {
        fields.iter().map(|field| field.str()).collect()
    }

    fn split_sub(text: &str, ifs: Option<&str>) -> Vec<String> {
        // A substitution result, eligible for splitting.
        strings(&split_fields(&Word::new_substitution(text), ifs))
    }

    #[test]
    fn test_default_whitespace_collapse() {
        assert_eq!(split_sub("  a \t b\nc  ", None), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_value_yields_no_field() {
        assert!(split_sub("", None).is_empty());
        assert!(split_sub("   ", None).is_empty());
    }

    #[test]
    fn test_non_whitespace_delimiters() {
        assert_eq!(split_sub("a:b:c", Some(":")), vec!["a", "b", "c"]);
        assert_eq!(split_sub("a::b", Some(":")), vec!["a", "", "b"]);
        assert_eq!(split_sub(":a", Some(":")), vec!["", "a"]);
        assert_eq!(split_sub("a:", Some(":")), vec!["a"]);
    }

    #[test]
    fn test_mixed_ifs() {
        assert_eq!(split_sub("a : b", Some(": ")), vec!["a", "b"]);
        assert_eq!(split_sub("a : : b", Some(": ")), vec!["a", "", "b"]);
    }

    #[test]
    fn test_empty_ifs_is_identity() {
        assert_eq!(split_sub("a b c", Some("")), vec!["a b c"]);
    }

    #[test]
    fn test_unsplit_strings_are_glue() {
        // "a b" from a double-quoted context joins the adjacent text.
        let word = Word::new_list(
            vec![Word::new_substitution("x y"), Word::new_unsplit("a b")],
            false,
        );
        assert_eq!(strings(&split_fields(&word, None)), vec!["x", "ya b"]);
    }

    #[test]
    fn test_double_quoted_list_single_field() {
        let word = Word::new_list(vec![Word::new_unsplit("a b")], true);
        assert_eq!(strings(&split_fields(&word, None)), vec!["a b"]);
    }

    #[test]
    fn test_empty_double_quotes_produce_empty_field() {
        let word = Word::new_list(vec![], true);
        assert_eq!(strings(&split_fields(&word, None)), vec![""]);
    }

    #[test]
    fn test_quoted_at_expansion_fields() {
        // The shape "$@" expands to: unsplit params joined by split-eligible
        // separators, inside the double-quoted list.
        let at = Word::new_list(
            vec![
                Word::new_unsplit("a:b"),
                Word::new_substitution(" "),
                Word::new_unsplit("c:d"),
            ],
            false,
        );
        let word = Word::new_list(vec![at], true);
        // Splitting must keep one field per parameter even with IFS=":".
        assert_eq!(strings(&split_fields(&word, Some(":"))), vec!["a:b", "c:d"]);
    }

    #[test]
    fn test_quoted_at_with_zero_params_yields_zero_fields() {
        let at = Word::new_list(vec![], false);
        let word = Word::new_list(vec![at], true);
        assert!(split_fields(&word, None).is_empty());
    }

    #[test]
    fn test_single_quoted_protects_ifs_chars() {
        let word = Word::new_list(
            vec![Word::new_single_quoted("a b"), Word::new_substitution(" c")],
            false,
        );
        assert_eq!(strings(&split_fields(&word, None)), vec!["a b", "c"]);
    }
}
