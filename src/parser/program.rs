//! Program Parser
//!
//! Recursive descent over the POSIX shell grammar (§2.10): simple commands,
//! pipelines, and-or lists, compound commands, case clauses, function
//! definitions. Reserved words are recognized only where a command name or a
//! compound-command terminator is expected, by comparing the length-delimited
//! peek of the next word. Aliases are applied at command-word positions by
//! splicing the replacement into the input buffer. Here-document bodies are
//! read after the newline that terminates the containing complete command and
//! attached to their redirects in source order.

use std::collections::{HashSet, VecDeque};

use crate::ast::*;
use crate::parser::lexer::{is_blank, operator_str};
use crate::parser::{Parser, PendingHereDoc, Symbol};

/// Words reserved when a command name is expected.
const KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "do", "done", "case", "esac", "while",
    "until", "for", "{", "}", "!", "in",
];

/// How many alias splices a single command position may trigger before the
/// parser assumes a cycle.
const MAX_ALIAS_DEPTH: usize = 64;

fn is_alias_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'!' | b'%' | b',' | b'@')
}

impl Parser {
    /// Consume a named multi-character operator.
    fn operator(&mut self, sym: Symbol) -> bool {
        if !self.symbol(sym) {
            return false;
        }
        let str = operator_str(sym).expect("named operator");
        let read = self.cursor.read(str.len());
        debug_assert_eq!(read, str);
        self.consume_symbol();
        true
    }

    /// Consume a literal token: a single-character operator or a reserved
    /// word delimited exactly. Returns its begin position.
    pub(crate) fn token(&mut self, str: &str) -> Option<Position> {
        if !self.symbol(Symbol::Token) {
            return None;
        }

        let begin = self.cursor.pos();
        if str.len() == 1 && !str.as_bytes()[0].is_ascii_alphabetic() {
            if self.cursor.peek_char() != str.as_bytes()[0] {
                return None;
            }
            self.cursor.read_char();
        } else {
            let word_len = self.peek_word_len(0);
            if word_len != str.len() || self.cursor.peek(word_len) != str.as_bytes() {
                return None;
            }
            self.cursor.read(word_len);
        }

        self.consume_symbol();
        Some(begin)
    }

    fn expect_token(&mut self, str: &str) -> Option<Position> {
        match self.token(str) {
            Some(pos) => Some(pos),
            None => {
                self.set_error(format!("expected '{}'", str));
                None
            }
        }
    }

    pub(crate) fn expect_operand_token(&mut self, str: &str) -> bool {
        self.expect_token(str).is_some()
    }

    // =========================================================================
    // ALIASES
    // =========================================================================

    /// Length of the next token if all of its characters belong to the alias
    /// name set.
    fn peek_alias_len(&mut self) -> usize {
        let n = self.peek_word_len(0);
        for i in 0..n {
            if !is_alias_char(self.cursor.peek_at(i)) {
                return 0;
            }
        }
        n
    }

    /// Substitute aliases at a command-word position by splicing the
    /// replacement text into the input buffer. A replacement ending in a
    /// blank makes the following word eligible too. Cycles are cut by
    /// remembering the names already substituted at this position.
    pub(crate) fn apply_aliases(&mut self) {
        let mut seen: HashSet<String> = HashSet::new();

        for _ in 0..MAX_ALIAS_DEPTH {
            if !self.symbol(Symbol::Token) {
                return;
            }

            let alias_len = self.peek_alias_len();
            if alias_len == 0 {
                return;
            }

            let name =
                String::from_utf8_lossy(self.cursor.peek(alias_len)).into_owned();
            let replacement = match self.aliases.get(&name) {
                Some(replacement) => replacement.clone(),
                None => return,
            };
            if !seen.insert(name) {
                return;
            }

            self.alias_next_word = replacement
                .as_bytes()
                .last()
                .map(|&b| is_blank(b))
                .unwrap_or(false);
            self.cursor.splice(alias_len, &replacement);
            self.consume_symbol();
        }
    }

    // =========================================================================
    // REDIRECTIONS & ASSIGNMENTS
    // =========================================================================

    /// A leading IO number is a digit directly followed by `<` or `>`.
    fn io_number(&mut self) -> Option<i32> {
        if !self.symbol(Symbol::Token) {
            return None;
        }
        let c = self.cursor.peek_char();
        if !c.is_ascii_digit() {
            return None;
        }
        let next = self.cursor.peek_at(1);
        if next != b'<' && next != b'>' {
            return None;
        }
        self.cursor.read_char();
        self.consume_symbol();
        Some((c - b'0') as i32)
    }

    fn io_file_op(&mut self) -> Option<IoRedirectOp> {
        if self.token("<").is_some() {
            Some(IoRedirectOp::Less)
        } else if self.token(">").is_some() {
            Some(IoRedirectOp::Great)
        } else if self.operator(Symbol::LessAnd) {
            Some(IoRedirectOp::LessAnd)
        } else if self.operator(Symbol::GreatAnd) {
            Some(IoRedirectOp::GreatAnd)
        } else if self.operator(Symbol::DGreat) {
            Some(IoRedirectOp::DGreat)
        } else if self.operator(Symbol::Clobber) {
            Some(IoRedirectOp::Clobber)
        } else if self.operator(Symbol::LessGreat) {
            Some(IoRedirectOp::LessGreat)
        } else {
            None
        }
    }

    fn io_here_op(&mut self) -> Option<IoRedirectOp> {
        if self.operator(Symbol::DLessDash) {
            Some(IoRedirectOp::DLessDash)
        } else if self.operator(Symbol::DLess) {
            Some(IoRedirectOp::DLess)
        } else {
            None
        }
    }

    fn io_redirect(&mut self) -> Option<IoRedirect> {
        let io_number_pos = self.cursor.pos();
        let io_number = self.io_number();

        let op_begin = self.cursor.pos();
        if let Some(op) = self.io_file_op() {
            let op_range = Range { begin: op_begin, end: self.cursor.pos() };
            let name = match self.word(0) {
                Some(name) => name,
                None => {
                    self.set_error(
                        "expected a filename after IO file redirection operator",
                    );
                    return None;
                }
            };
            return Some(IoRedirect {
                io_number,
                op,
                name,
                here_document: Vec::new(),
                op_range,
                io_number_pos: io_number.map(|_| io_number_pos),
            });
        }

        if let Some(op) = self.io_here_op() {
            let op_range = Range { begin: op_begin, end: self.cursor.pos() };
            let name = match self.word(0) {
                Some(name) => name,
                None => {
                    self.set_error(
                        "expected a name after IO here-document redirection operator",
                    );
                    return None;
                }
            };
            self.pending_here_docs.push(PendingHereDoc {
                delimiter: name.str(),
                strip_tabs: op == IoRedirectOp::DLessDash,
                quoted: name.is_quoted(),
            });
            return Some(IoRedirect {
                io_number,
                op,
                name,
                here_document: Vec::new(),
                op_range,
                io_number_pos: io_number.map(|_| io_number_pos),
            });
        }

        if io_number.is_some() {
            self.set_error("expected an IO redirect after IO number");
        }
        None
    }

    /// An assignment word is a valid name directly followed by `=`.
    fn assignment_word(&mut self) -> Option<Assignment> {
        if !self.symbol(Symbol::Token) {
            return None;
        }

        let name_len = self.peek_name_len(false);
        if name_len == 0 || self.cursor.peek_at(name_len) != b'=' {
            return None;
        }

        let name_pos = self.cursor.pos();
        let name = self.cursor.read(name_len);
        let equal_pos = self.cursor.pos();
        self.cursor.read_char();

        let value = self.word(0);
        if self.error.is_some() {
            return None;
        }
        self.consume_symbol();

        Some(Assignment {
            name,
            value: value.unwrap_or_else(|| Word::new_string("")),
            name_pos,
            equal_pos,
        })
    }

    // =========================================================================
    // SIMPLE COMMANDS
    // =========================================================================

    fn cmd_prefix(&mut self, cmd: &mut SimpleCommand) -> bool {
        if let Some(redir) = self.io_redirect() {
            cmd.io_redirects.push(redir);
            return true;
        }
        if self.error.is_some() {
            return false;
        }

        if let Some(assign) = self.assignment_word() {
            cmd.assignments.push(assign);
            return true;
        }

        false
    }

    /// The command-name position: aliases apply, reserved words do not
    /// qualify.
    fn cmd_name(&mut self) -> Option<Word> {
        self.apply_aliases();

        let word_len = self.peek_word_len(0);
        if word_len == 0 {
            return self.word(0);
        }

        let peeked = self.cursor.peek(word_len).to_vec();
        for keyword in KEYWORDS {
            if keyword.as_bytes() == peeked.as_slice() {
                return None;
            }
        }

        let begin = self.cursor.pos();
        let text = self.cursor.read(word_len);
        self.consume_symbol();
        Some(Word::String(WordString {
            text,
            single_quoted: false,
            split_fields: false,
            range: Range { begin, end: self.cursor.pos() },
        }))
    }

    fn cmd_suffix(&mut self, cmd: &mut SimpleCommand) -> bool {
        if let Some(redir) = self.io_redirect() {
            cmd.io_redirects.push(redir);
            return true;
        }
        if self.error.is_some() {
            return false;
        }

        if self.alias_next_word {
            self.alias_next_word = false;
            self.apply_aliases();
        }

        if let Some(arg) = self.word(0) {
            cmd.arguments.push(arg);
            return true;
        }

        false
    }

    fn simple_command(&mut self) -> Option<Command> {
        let mut cmd = SimpleCommand::default();

        let mut has_prefix = false;
        while self.cmd_prefix(&mut cmd) {
            has_prefix = true;
        }
        if self.error.is_some() {
            return None;
        }

        cmd.name = self.cmd_name();
        if self.error.is_some() {
            return None;
        }
        if cmd.name.is_none() && !has_prefix {
            return None;
        }
        if cmd.name.is_some() {
            while self.cmd_suffix(&mut cmd) {}
            if self.error.is_some() {
                return None;
            }
        }

        Some(Command::Simple(cmd))
    }

    // =========================================================================
    // LISTS
    // =========================================================================

    fn separator_op(&mut self) -> Option<(u8, Position)> {
        if let Some(pos) = self.token("&") {
            return Some((b'&', pos));
        }
        if let Some(pos) = self.token(";") {
            return Some((b';', pos));
        }
        None
    }

    fn separator(&mut self) -> Option<(u8, Position)> {
        if let Some(sep) = self.separator_op() {
            self.linebreak();
            return Some(sep);
        }
        let pos = self.cursor.pos();
        if self.newline_list() {
            return Some((b'\n', pos));
        }
        None
    }

    fn sequential_sep(&mut self) -> bool {
        if self.token(";").is_some() {
            self.linebreak();
            return true;
        }
        self.newline_list()
    }

    /// One and-or list with its separator, inside a compound list.
    fn term(&mut self) -> Option<CommandList> {
        let node = self.and_or()?;

        let mut cmd = CommandList { node, ampersand: false, separator_pos: None };
        if let Some((sep, pos)) = self.separator() {
            cmd.ampersand = sep == b'&';
            cmd.separator_pos = Some(pos);
        }
        Some(cmd)
    }

    fn expect_compound_list(&mut self) -> Option<Vec<CommandList>> {
        self.linebreak();

        let mut cmds = Vec::new();
        match self.term() {
            Some(term) => cmds.push(term),
            None => {
                self.set_error("expected a term");
                return None;
            }
        }

        loop {
            match self.term() {
                Some(term) => cmds.push(term),
                None => break,
            }
        }
        if self.error.is_some() {
            return None;
        }

        Some(cmds)
    }

    /// Zero or more terms, for case-item bodies which may be empty.
    fn compound_list_opt(&mut self) -> Option<Vec<CommandList>> {
        self.linebreak();
        let mut cmds = Vec::new();
        while let Some(term) = self.term() {
            cmds.push(term);
        }
        if self.error.is_some() {
            return None;
        }
        Some(cmds)
    }

    // =========================================================================
    // COMPOUND COMMANDS
    // =========================================================================

    fn brace_group(&mut self) -> Option<Command> {
        let lbrace_pos = self.token("{")?;

        let body = self.expect_compound_list()?;

        let rbrace_pos = self.expect_token("}")?;
        Some(Command::BraceGroup(BraceGroup { body, lbrace_pos, rbrace_pos }))
    }

    fn subshell(&mut self) -> Option<Command> {
        let lparen_pos = self.token("(")?;

        let body = self.expect_compound_list()?;

        let rparen_pos = self.expect_token(")")?;
        Some(Command::Subshell(Subshell { body, lparen_pos, rparen_pos }))
    }

    fn else_part(&mut self) -> Option<Command> {
        let begin = self.cursor.pos();

        if self.token("elif").is_some() {
            let condition = self.expect_compound_list()?;
            let then_pos = self.expect_token("then")?;
            let body = self.expect_compound_list()?;
            let else_part = self.else_part_opt()?;
            return Some(Command::If(IfClause {
                condition,
                body,
                else_part: else_part.map(Box::new),
                if_pos: begin,
                then_pos,
                fi_pos: Position::default(),
            }));
        }

        if self.token("else").is_some() {
            let body = self.expect_compound_list()?;
            return Some(Command::BraceGroup(BraceGroup {
                body,
                lbrace_pos: begin,
                rbrace_pos: Position::default(),
            }));
        }

        None
    }

    /// Like `else_part`, but distinguishes "no else" from an error.
    fn else_part_opt(&mut self) -> Option<Option<Command>> {
        let part = self.else_part();
        if self.error.is_some() {
            return None;
        }
        Some(part)
    }

    fn if_clause(&mut self) -> Option<Command> {
        let if_pos = self.token("if")?;

        let condition = self.expect_compound_list()?;
        let then_pos = self.expect_token("then")?;
        let body = self.expect_compound_list()?;
        let else_part = self.else_part_opt()?;
        let fi_pos = self.expect_token("fi")?;

        Some(Command::If(IfClause {
            condition,
            body,
            else_part: else_part.map(Box::new),
            if_pos,
            then_pos,
            fi_pos,
        }))
    }

    fn expect_do_group(&mut self) -> Option<(Vec<CommandList>, Position, Position)> {
        let do_pos = self.expect_token("do")?;
        let body = self.expect_compound_list()?;
        let done_pos = self.expect_token("done")?;
        Some((body, do_pos, done_pos))
    }

    fn for_clause(&mut self) -> Option<Command> {
        let for_pos = self.token("for")?;

        if !self.symbol(Symbol::Token) {
            self.set_error("expected a name");
            return None;
        }
        let name_len = self.peek_name_len(false);
        if name_len == 0 {
            self.set_error("expected a name");
            return None;
        }
        let name_pos = self.cursor.pos();
        let name = self.cursor.read(name_len);
        self.consume_symbol();

        self.linebreak();

        let maybe_in_pos = self.cursor.pos();
        let in_word = self.token("in").is_some();
        let in_pos = if in_word { maybe_in_pos } else { Position::default() };

        let mut word_list = Vec::new();
        if in_word {
            while let Some(w) = self.word(0) {
                word_list.push(w);
            }
            if self.error.is_some() {
                return None;
            }
            if !self.sequential_sep() {
                self.set_error("expected a sequential separator");
                return None;
            }
        } else {
            self.sequential_sep();
        }

        let (body, do_pos, done_pos) = self.expect_do_group()?;

        Some(Command::For(ForClause {
            name,
            in_word,
            word_list,
            body,
            for_pos,
            name_pos,
            in_pos,
            do_pos,
            done_pos,
        }))
    }

    fn loop_clause(&mut self) -> Option<Command> {
        let begin = self.cursor.pos();
        let kind = if self.token("while").is_some() {
            LoopKind::While
        } else if self.token("until").is_some() {
            LoopKind::Until
        } else {
            return None;
        };

        let condition = self.expect_compound_list()?;
        let (body, do_pos, done_pos) = self.expect_do_group()?;

        Some(Command::Loop(LoopClause { kind, condition, body, begin, do_pos, done_pos }))
    }

    fn case_item(&mut self) -> Option<CaseItem> {
        let lparen_pos = self.token("(");

        let mut patterns = Vec::new();
        loop {
            match self.word(0) {
                Some(pattern) => patterns.push(pattern),
                None => {
                    self.set_error("expected a pattern");
                    return None;
                }
            }
            if self.token("|").is_none() {
                break;
            }
        }
        self.expect_token(")")?;

        let body = self.compound_list_opt()?;

        Some(CaseItem { patterns, body, lparen_pos, dsemi_range: Range::default() })
    }

    fn case_clause(&mut self) -> Option<Command> {
        let case_pos = self.token("case")?;

        let word = match self.word(0) {
            Some(word) => word,
            None => {
                self.set_error("expected a word");
                return None;
            }
        };

        self.linebreak();
        let in_pos = self.expect_token("in")?;
        self.linebreak();

        let mut items = Vec::new();
        let esac_pos;
        loop {
            if let Some(pos) = self.token("esac") {
                esac_pos = pos;
                break;
            }
            if self.eof() {
                self.set_error("expected 'esac'");
                return None;
            }

            let mut item = self.case_item()?;

            let dsemi_begin = self.cursor.pos();
            if self.operator(Symbol::DSemi) {
                item.dsemi_range = Range { begin: dsemi_begin, end: self.cursor.pos() };
                self.linebreak();
                items.push(item);
            } else {
                // The last item may omit `;;` before `esac`.
                self.linebreak();
                items.push(item);
                match self.token("esac") {
                    Some(pos) => {
                        esac_pos = pos;
                        break;
                    }
                    None => {
                        self.set_error("expected ';;'");
                        return None;
                    }
                }
            }
        }

        Some(Command::Case(CaseClause { word, items, case_pos, in_pos, esac_pos }))
    }

    fn function_definition(&mut self) -> Option<Command> {
        if !self.symbol(Symbol::Token) {
            return None;
        }
        let name_len = self.peek_name_len(false);
        if name_len == 0 {
            return None;
        }

        // Commit only if blanks and a `(` follow the name.
        let mut i = name_len;
        loop {
            let c = self.cursor.peek_at(i);
            if c == b'(' {
                break;
            }
            if !is_blank(c) {
                return None;
            }
            i += 1;
        }

        let name_pos = self.cursor.pos();
        let name = self.cursor.read(name_len);
        self.consume_symbol();

        let lparen_pos = self.expect_token("(")?;
        let rparen_pos = self.expect_token(")")?;

        self.linebreak();

        let body = match self.compound_command() {
            Some(body) => body,
            None => {
                self.set_error("expected a compound command");
                return None;
            }
        };

        Some(Command::FunctionDefinition(FunctionDefinition {
            name,
            body: Box::new(body),
            name_pos,
            lparen_pos,
            rparen_pos,
        }))
    }

    fn compound_command(&mut self) -> Option<Command> {
        macro_rules! try_production {
            ($production:expr) => {
                if let Some(cmd) = $production {
                    return Some(cmd);
                }
                if self.error.is_some() {
                    return None;
                }
            };
        }

        try_production!(self.brace_group());
        try_production!(self.subshell());
        try_production!(self.if_clause());
        try_production!(self.for_clause());
        try_production!(self.loop_clause());
        try_production!(self.case_clause());
        try_production!(self.function_definition());
        None
    }

    fn command(&mut self) -> Option<Command> {
        self.apply_aliases();

        if let Some(cmd) = self.compound_command() {
            return Some(cmd);
        }
        if self.error.is_some() {
            return None;
        }

        self.simple_command()
    }

    fn pipeline(&mut self) -> Option<Node> {
        let bang_pos = self.token("!");
        let bang = bang_pos.is_some();

        let cmd = match self.command() {
            Some(cmd) => cmd,
            None => {
                if bang {
                    self.set_error("expected a command");
                }
                return None;
            }
        };

        let mut commands = vec![cmd];
        while self.token("|").is_some() {
            self.linebreak();
            match self.command() {
                Some(cmd) => commands.push(cmd),
                None => {
                    self.set_error("expected a command");
                    return None;
                }
            }
        }

        Some(Node::Pipeline(Pipeline { commands, bang, bang_pos }))
    }

    fn and_or(&mut self) -> Option<Node> {
        let left = self.pipeline()?;

        let op_pos = self.cursor.pos();
        let kind = if self.operator(Symbol::AndIf) {
            BinopKind::And
        } else if self.operator(Symbol::OrIf) {
            BinopKind::Or
        } else {
            return Some(left);
        };

        self.linebreak();
        let right = match self.and_or() {
            Some(right) => right,
            None => {
                self.set_error("expected an AND-OR list");
                return None;
            }
        };

        Some(Node::Binop(Binop {
            kind,
            left: Box::new(left),
            right: Box::new(right),
            op_pos,
        }))
    }

    /// One and-or list with an optional `&`/`;` separator, at top level.
    fn list(&mut self) -> Option<CommandList> {
        let node = self.and_or()?;

        let mut cmd = CommandList { node, ampersand: false, separator_pos: None };
        if let Some((sep, pos)) = self.separator_op() {
            cmd.ampersand = sep == b'&';
            cmd.separator_pos = Some(pos);
        }
        Some(cmd)
    }

    // =========================================================================
    // HERE-DOCUMENTS
    // =========================================================================

    /// Read one here-document body, until a line equals the delimiter.
    /// The newline after the delimiter line is left for the caller.
    fn expect_here_document(&mut self, pending: &PendingHereDoc) -> Option<Vec<Word>> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            loop {
                let c = self.cursor.peek_char();
                if c == 0 || c == b'\n' {
                    break;
                }
                line.push(self.cursor.read_char() as char);
            }

            let content = if pending.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line.as_str()
            };

            if content == pending.delimiter {
                break;
            }
            if self.eof() {
                self.set_error("unterminated here-document");
                return None;
            }
            let ok = self.newline();
            debug_assert!(ok);

            if pending.quoted {
                lines.push(Word::new_single_quoted(content));
            } else {
                let mut subparser = Parser::from_str(content);
                match subparser.here_document_line() {
                    Some(word) => lines.push(word),
                    None => {
                        let err = subparser.take_error();
                        self.set_error(err.message);
                        return None;
                    }
                }
            }
        }
        Some(lines)
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    fn expect_complete_command(&mut self) -> Option<Vec<CommandList>> {
        let mut cmds = Vec::new();
        match self.list() {
            Some(list) => cmds.push(list),
            None => {
                if self.error.is_none() {
                    self.set_error("expected a complete command");
                }
                return None;
            }
        }

        while let Some(list) = self.list() {
            cmds.push(list);
        }
        if self.error.is_some() {
            return None;
        }

        if !self.pending_here_docs.is_empty() {
            let pendings = std::mem::take(&mut self.pending_here_docs);
            let mut bodies = VecDeque::new();
            for pending in &pendings {
                if !self.newline() {
                    self.set_error("expected a newline followed by a here-document");
                    return None;
                }
                bodies.push_back(self.expect_here_document(pending)?);
            }
            attach_here_documents(&mut cmds, &mut bodies);
            debug_assert!(bodies.is_empty());
        }

        Some(cmds)
    }

    fn program(&mut self, in_substitution: bool) -> Option<Program> {
        let mut program = Program::default();

        let at_end = |parser: &mut Parser| {
            parser.eof() || (in_substitution && parser.cursor.peek_char() == b')')
        };

        self.linebreak();
        if at_end(self) {
            return Some(program);
        }

        program.body.extend(self.expect_complete_command()?);

        while self.newline_list() {
            if at_end(self) {
                return Some(program);
            }
            program.body.extend(self.expect_complete_command()?);
        }

        self.linebreak();
        Some(program)
    }

    /// Parse an embedded program inside `$(...)`, stopping at the
    /// unbalanced closing parenthesis.
    pub(crate) fn parse_program_until_paren(&mut self) -> Option<Program> {
        self.program(true)
    }

    /// Parse a whole program until end of input.
    pub fn parse_program(&mut self) -> Result<Program, crate::parser::ParseError> {
        match self.program(false) {
            Some(program) if self.error.is_none() => {
                if !self.eof() {
                    self.set_error("unexpected token");
                    return Err(self.take_error());
                }
                Ok(program)
            }
            _ => Err(self.take_error()),
        }
    }

    /// Parse one complete command in line mode, as the interactive driver
    /// does. Returns `Ok(None)` at end of input; an empty line yields an
    /// empty program. On a syntax error the rest of the line is consumed so
    /// the caller can continue.
    pub fn parse_line(&mut self) -> Result<Option<Program>, crate::parser::ParseError> {
        if self.eof() {
            return Ok(None);
        }
        if self.newline() {
            return Ok(Some(Program::default()));
        }

        let mut program = Program::default();
        match self.expect_complete_command() {
            Some(cmds) => program.body.extend(cmds),
            None => return Err(self.recover_line()),
        }
        if !self.eof() && !self.newline() {
            self.set_error("expected a newline");
            return Err(self.recover_line());
        }

        Ok(Some(program))
    }

    /// Consume through the next newline after an error so interactive use
    /// can continue.
    fn recover_line(&mut self) -> crate::parser::ParseError {
        let err = self.take_error();
        loop {
            let c = self.cursor.read_char();
            if c == 0 || c == b'\n' {
                break;
            }
        }
        self.sym = None;
        err
    }
}

/// Attach here-document bodies to the `<<`/`<<-` redirects of a parsed
/// complete command, in source order.
fn attach_here_documents(cmds: &mut [CommandList], bodies: &mut VecDeque<Vec<Word>>) {
    for list in cmds {
        attach_node(&mut list.node, bodies);
    }
}

fn attach_node(node: &mut Node, bodies: &mut VecDeque<Vec<Word>>) {
    match node {
        Node::Pipeline(pl) => {
            for cmd in &mut pl.commands {
                attach_command(cmd, bodies);
            }
        }
        Node::Binop(binop) => {
            attach_node(&mut binop.left, bodies);
            attach_node(&mut binop.right, bodies);
        }
    }
}

fn attach_command(cmd: &mut Command, bodies: &mut VecDeque<Vec<Word>>) {
    match cmd {
        Command::Simple(sc) => {
            for redir in &mut sc.io_redirects {
                if redir.op.is_here_document() && redir.here_document.is_empty() {
                    if let Some(body) = bodies.pop_front() {
                        redir.here_document = body;
                    }
                }
            }
        }
        Command::BraceGroup(bg) => attach_here_documents(&mut bg.body, bodies),
        Command::Subshell(s) => attach_here_documents(&mut s.body, bodies),
        Command::If(ic) => {
            attach_here_documents(&mut ic.condition, bodies);
            attach_here_documents(&mut ic.body, bodies);
            if let Some(else_part) = &mut ic.else_part {
                attach_command(else_part, bodies);
            }
        }
        Command::For(fc) => attach_here_documents(&mut fc.body, bodies),
        Command::Loop(lc) => {
            attach_here_documents(&mut lc.condition, bodies);
            attach_here_documents(&mut lc.body, bodies);
        }
        Command::Case(cc) => {
            for item in &mut cc.items {
                attach_here_documents(&mut item.body, bodies);
            }
        }
        Command::FunctionDefinition(fd) => attach_command(&mut fd.body, bodies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::print::format_program;
    use crate::parser::parse;

    fn parse_ok(src: &str) -> Program {
        match parse(src) {
            Ok(program) => program,
            Err(err) => panic!("parse failed for {:?}: {}", src, err),
        }
    }

    fn first_simple(program: &Program) -> &SimpleCommand {
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::Simple(sc) => sc,
                other => panic!("expected simple command, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program() {
        let program = parse_ok("");
        assert!(program.body.is_empty());

        let program = parse_ok("\n\n  \n# only a comment\n");
        assert!(program.body.is_empty());
    }

    #[test]
    fn test_simple_command_shape() {
        let program = parse_ok("FOO=1 BAR=2 echo -n hi >out 2>&1");
        let sc = first_simple(&program);
        assert_eq!(sc.assignments.len(), 2);
        assert_eq!(sc.assignments[0].name, "FOO");
        assert_eq!(sc.name.as_ref().unwrap().str(), "echo");
        assert_eq!(sc.arguments.len(), 2);
        assert_eq!(sc.io_redirects.len(), 2);
        assert_eq!(sc.io_redirects[1].io_number, Some(2));
        assert_eq!(sc.io_redirects[1].op, IoRedirectOp::GreatAnd);
    }

    #[test]
    fn test_bare_assignment_command() {
        let program = parse_ok("x=1");
        let sc = first_simple(&program);
        assert!(sc.name.is_none());
        assert_eq!(sc.assignments.len(), 1);
    }

    #[test]
    fn test_empty_assignment_value() {
        let program = parse_ok("x= echo hi");
        let sc = first_simple(&program);
        assert_eq!(sc.assignments[0].value.str(), "");
        assert_eq!(sc.name.as_ref().unwrap().str(), "echo");
    }

    #[test]
    fn test_pipeline_and_bang() {
        let program = parse_ok("! a | b | c");
        match &program.body[0].node {
            Node::Pipeline(pl) => {
                assert!(pl.bang);
                assert_eq!(pl.commands.len(), 3);
            }
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_and_or_chain() {
        let program = parse_ok("a && b || c");
        match &program.body[0].node {
            Node::Binop(binop) => {
                assert_eq!(binop.kind, BinopKind::And);
                // Right recursion: b || c hangs off the right side.
                match binop.right.as_ref() {
                    Node::Binop(right) => assert_eq!(right.kind, BinopKind::Or),
                    other => panic!("expected binop, got {:?}", other),
                }
            }
            other => panic!("expected binop, got {:?}", other),
        }
    }

    #[test]
    fn test_ampersand_separator() {
        let program = parse_ok("sleep 1 & echo done");
        assert_eq!(program.body.len(), 2);
        assert!(program.body[0].ampersand);
        assert!(!program.body[1].ampersand);
    }

    #[test]
    fn test_if_elif_else() {
        let program = parse_ok("if a; then b; elif c; then d; else e; fi");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::If(ic) => {
                    assert_eq!(ic.condition.len(), 1);
                    match ic.else_part.as_deref() {
                        Some(Command::If(elif)) => {
                            assert!(elif.else_part.is_some());
                        }
                        other => panic!("expected elif, got {:?}", other),
                    }
                }
                other => panic!("expected if, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_while_and_until() {
        let program = parse_ok("while a; do b; done");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::Loop(lc) => assert_eq!(lc.kind, LoopKind::While),
                other => panic!("expected loop, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }

        let program = parse_ok("until a; do b; done");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::Loop(lc) => assert_eq!(lc.kind, LoopKind::Until),
                other => panic!("expected loop, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_for_clause() {
        let program = parse_ok("for i in a b c; do echo $i; done");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::For(fc) => {
                    assert_eq!(fc.name, "i");
                    assert!(fc.in_word);
                    assert_eq!(fc.word_list.len(), 3);
                }
                other => panic!("expected for, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_for_without_in() {
        let program = parse_ok("for arg; do echo \"$arg\"; done");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::For(fc) => {
                    assert!(!fc.in_word);
                    assert!(fc.word_list.is_empty());
                }
                other => panic!("expected for, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_case_clause() {
        let program = parse_ok("case $x in a|b) echo ab;; (c) echo c;; *) : ; esac");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::Case(cc) => {
                    assert_eq!(cc.items.len(), 3);
                    assert_eq!(cc.items[0].patterns.len(), 2);
                    assert!(cc.items[1].lparen_pos.is_some());
                }
                other => panic!("expected case, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_case_empty_body() {
        parse_ok("case x in a) ;; esac");
    }

    #[test]
    fn test_subshell_and_brace_group() {
        parse_ok("(cd /tmp; pwd)");
        parse_ok("{ echo a; echo b; }");
    }

    #[test]
    fn test_function_definition() {
        let program = parse_ok("greet() { echo hello; }");
        match &program.body[0].node {
            Node::Pipeline(pl) => match &pl.commands[0] {
                Command::FunctionDefinition(fd) => {
                    assert_eq!(fd.name, "greet");
                    assert!(matches!(fd.body.as_ref(), Command::BraceGroup(_)));
                }
                other => panic!("expected function, got {:?}", other),
            },
            other => panic!("expected pipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_word_not_command_name() {
        assert!(parse("fi").is_err());
        assert!(parse("then echo x").is_err());
    }

    #[test]
    fn test_here_document() {
        let program = parse_ok("cat <<EOF\nhello $USER\nworld\nEOF\n");
        let sc = first_simple(&program);
        let redir = &sc.io_redirects[0];
        assert_eq!(redir.op, IoRedirectOp::DLess);
        assert_eq!(redir.here_document.len(), 2);
        // Unquoted delimiter: lines are reparsed and contain substitutions.
        match &redir.here_document[0] {
            Word::List(wl) => assert_eq!(wl.children.len(), 2),
            other => panic!("expected list line, got {:?}", other),
        }
    }

    #[test]
    fn test_here_document_quoted_delimiter() {
        let program = parse_ok("cat <<'EOF'\nhello $USER\nEOF\n");
        let sc = first_simple(&program);
        let redir = &sc.io_redirects[0];
        assert_eq!(redir.here_document.len(), 1);
        assert_eq!(redir.here_document[0].str(), "hello $USER");
        assert!(redir.here_document[0].is_quoted());
    }

    #[test]
    fn test_here_document_strip_tabs() {
        let program = parse_ok("cat <<-EOF\n\t\tindented\n\tEOF\n");
        let sc = first_simple(&program);
        assert_eq!(sc.io_redirects[0].here_document[0].str(), "indented");
    }

    #[test]
    fn test_two_here_documents() {
        let program = parse_ok("cat <<A <<B\nfirst\nA\nsecond\nB\n");
        let sc = first_simple(&program);
        assert_eq!(sc.io_redirects[0].here_document[0].str(), "first");
        assert_eq!(sc.io_redirects[1].here_document[0].str(), "second");
    }

    #[test]
    fn test_unterminated_here_document() {
        assert!(parse("cat <<EOF\nno delimiter").is_err());
    }

    #[test]
    fn test_alias_substitution() {
        let mut parser = Parser::from_str("ll -a");
        parser.aliases.insert("ll".to_string(), "ls -l".to_string());
        let program = parser.parse_program().unwrap();
        let sc = first_simple(&program);
        assert_eq!(sc.name.as_ref().unwrap().str(), "ls");
        assert_eq!(sc.arguments.len(), 2);
    }

    #[test]
    fn test_alias_self_reference_stops() {
        let mut parser = Parser::from_str("ls");
        parser.aliases.insert("ls".to_string(), "ls -l".to_string());
        let program = parser.parse_program().unwrap();
        let sc = first_simple(&program);
        assert_eq!(sc.name.as_ref().unwrap().str(), "ls");
        assert_eq!(sc.arguments.len(), 1);
    }

    #[test]
    fn test_alias_trailing_blank_expands_next_word() {
        let mut parser = Parser::from_str("run ll");
        parser.aliases.insert("run".to_string(), "env ".to_string());
        parser.aliases.insert("ll".to_string(), "ls -l".to_string());
        let program = parser.parse_program().unwrap();
        let sc = first_simple(&program);
        assert_eq!(sc.name.as_ref().unwrap().str(), "env");
        assert_eq!(sc.arguments.len(), 2);
        assert_eq!(sc.arguments[0].str(), "ls");
    }

    #[test]
    fn test_parse_line_recovers_after_error() {
        let mut parser = Parser::from_str(") bad\necho ok\n");
        assert!(parser.parse_line().is_err());
        let program = parser.parse_line().unwrap().unwrap();
        assert_eq!(program.body.len(), 1);
        assert!(parser.parse_line().unwrap().is_none());
    }

    #[test]
    fn test_syntax_error_has_position() {
        let err = parse("echo |").unwrap_err();
        assert!(err.position.line >= 1);
    }

    #[test]
    fn test_format_is_fixpoint_under_reparse() {
        let sources = [
            "echo hello world",
            "x=1 y=$z cmd <in >>out",
            "! a | b && c || d",
            "if a; then b; else c; fi",
            "for i in 1 2 3; do echo $i; done",
            "while :; do break; done",
            "case $x in (a|b) echo y;; *) echo n;; esac",
            "f() { echo \"$1\"; }",
            "(a; b) & c",
            "echo \"quoted $var\" 'single' ${x:-default} $(inner cmd) $((1+2))",
        ];
        for src in sources {
            let first = format_program(&parse_ok(src));
            let second = format_program(&parse_ok(&first));
            assert_eq!(first, second, "source: {}", src);
        }
    }
}
