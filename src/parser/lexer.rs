//! Token Recognition
//!
//! The lexer layer over the source cursor, per POSIX §2.3: it classifies the
//! next piece of input as a named operator, a newline, end of input, or a
//! TOKEN whose interpretation is left to the parser. Blanks and comments are
//! skipped here. Operators are matched greedily, longest first.

use crate::parser::Parser;

/// The lexer's view of the next input: TOKEN, NEWLINE, EOF, or one of the
/// multi-character operators. Single-character operators (`| & ; ( ) < >`)
/// stay inside TOKEN and are matched by the grammar directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Token,
    Newline,
    Eof,
    /// `&&`
    AndIf,
    /// `||`
    OrIf,
    /// `;;`
    DSemi,
    /// `<<`
    DLess,
    /// `<<-`
    DLessDash,
    /// `>>`
    DGreat,
    /// `<&`
    LessAnd,
    /// `>&`
    GreatAnd,
    /// `<>`
    LessGreat,
    /// `>|`
    Clobber,
}

/// Operator spellings, longest first so `<<-` wins over `<<`.
pub(crate) const OPERATORS: &[(&str, Symbol)] = &[
    ("<<-", Symbol::DLessDash),
    ("&&", Symbol::AndIf),
    ("||", Symbol::OrIf),
    (";;", Symbol::DSemi),
    ("<<", Symbol::DLess),
    (">>", Symbol::DGreat),
    ("<&", Symbol::LessAnd),
    (">&", Symbol::GreatAnd),
    ("<>", Symbol::LessGreat),
    (">|", Symbol::Clobber),
];

pub(crate) fn operator_str(sym: Symbol) -> Option<&'static str> {
    OPERATORS.iter().find(|(_, s)| *s == sym).map(|(str, _)| *str)
}

pub(crate) fn is_operator_start(c: u8) -> bool {
    matches!(c, b'&' | b'|' | b';' | b'<' | b'>')
}

pub(crate) fn is_blank(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

impl Parser {
    /// See POSIX §2.3 Token Recognition.
    fn next_symbol(&mut self) -> Symbol {
        loop {
            let c = self.cursor.peek_char();

            if c == 0 {
                return Symbol::Eof;
            }
            if c == b'\n' {
                return Symbol::Newline;
            }

            if is_operator_start(c) {
                for (str, sym) in OPERATORS {
                    if self.cursor.peek(str.len()) == str.as_bytes() {
                        return *sym;
                    }
                }
            }

            if is_blank(c) {
                self.cursor.read_char();
                continue;
            }

            if c == b'#' {
                loop {
                    let c = self.cursor.peek_char();
                    if c == 0 || c == b'\n' {
                        break;
                    }
                    self.cursor.read_char();
                }
                continue;
            }

            return Symbol::Token;
        }
    }

    pub(crate) fn get_symbol(&mut self) -> Symbol {
        match self.sym {
            Some(sym) => sym,
            None => {
                let sym = self.next_symbol();
                self.sym = Some(sym);
                sym
            }
        }
    }

    pub(crate) fn consume_symbol(&mut self) {
        self.sym = None;
    }

    pub(crate) fn symbol(&mut self, sym: Symbol) -> bool {
        self.get_symbol() == sym
    }

    pub(crate) fn eof(&mut self) -> bool {
        self.symbol(Symbol::Eof)
    }

    pub(crate) fn newline(&mut self) -> bool {
        if !self.symbol(Symbol::Newline) {
            return false;
        }
        let c = self.cursor.read_char();
        debug_assert_eq!(c, b'\n');
        self.consume_symbol();
        true
    }

    pub(crate) fn linebreak(&mut self) {
        while self.newline() {}
    }

    pub(crate) fn newline_list(&mut self) -> bool {
        if !self.newline() {
            return false;
        }
        self.linebreak();
        true
    }

    /// Length of the plain unquoted run starting the next TOKEN: stops at
    /// blanks, operators, newline, `)`, `end`, and reports zero when a
    /// quoting or substitution introducer comes first. Lets the parser
    /// compare reserved words and names without committing.
    pub(crate) fn peek_word_len(&mut self, end: u8) -> usize {
        if !self.symbol(Symbol::Token) {
            return 0;
        }

        let mut i = 0;
        loop {
            let c = self.cursor.peek_at(i);
            match c {
                0 | b'\n' | b')' => return i,
                b'$' | b'`' | b'\'' | b'"' | b'\\' => return 0,
                _ => {}
            }
            if is_operator_start(c) || is_blank(c) || c == end {
                return i;
            }
            i += 1;
        }
    }

    /// Length of a leading name: underscores, digits and alphabetics, not
    /// starting with a digit. Inside `${...}` a leading digit is allowed so
    /// positional parameters parse.
    pub(crate) fn peek_name_len(&mut self, in_braces: bool) -> usize {
        let mut i = 0;
        loop {
            let c = self.cursor.peek_at(i);
            if c != b'_' && !c.is_ascii_alphanumeric() {
                break;
            }
            if i == 0 && c.is_ascii_digit() && !in_braces {
                break;
            }
            i += 1;
        }
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_recognition() {
        let mut p = Parser::from_str("&& x");
        assert_eq!(p.get_symbol(), Symbol::AndIf);
    }

    #[test]
    fn test_longest_match_wins() {
        let mut p = Parser::from_str("<<-EOF");
        assert_eq!(p.get_symbol(), Symbol::DLessDash);

        let mut p = Parser::from_str("<<EOF");
        assert_eq!(p.get_symbol(), Symbol::DLess);
    }

    #[test]
    fn test_single_char_operators_stay_tokens() {
        for src in ["| x", "; x", "& x", "< f", "> f"] {
            let mut p = Parser::from_str(src);
            assert_eq!(p.get_symbol(), Symbol::Token, "src: {}", src);
        }
    }

    #[test]
    fn test_blanks_and_comments_skipped() {
        let mut p = Parser::from_str("   # a comment\nfoo");
        assert_eq!(p.get_symbol(), Symbol::Newline);
        assert!(p.newline());
        assert_eq!(p.get_symbol(), Symbol::Token);
    }

    #[test]
    fn test_eof() {
        let mut p = Parser::from_str("");
        assert_eq!(p.get_symbol(), Symbol::Eof);
    }

    #[test]
    fn test_peek_word_len() {
        let mut p = Parser::from_str("hello world");
        assert_eq!(p.peek_word_len(0), 5);

        let mut p = Parser::from_str("if;");
        assert_eq!(p.peek_word_len(0), 2);

        // Substitution introducers make the peek report zero.
        let mut p = Parser::from_str("a$b");
        assert_eq!(p.peek_word_len(0), 0);

        let mut p = Parser::from_str("a)b");
        assert_eq!(p.peek_word_len(0), 1);
    }

    #[test]
    fn test_peek_name_len() {
        let mut p = Parser::from_str("foo_1=bar");
        assert_eq!(p.peek_name_len(false), 5);

        let mut p = Parser::from_str("1abc");
        assert_eq!(p.peek_name_len(false), 0);
        assert_eq!(p.peek_name_len(true), 4);
    }
}
