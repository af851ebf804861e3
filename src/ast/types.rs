//! Abstract Syntax Tree Types
//!
//! This module defines the AST for the POSIX shell command language.
//! Every node carries source positions for diagnostics and highlighting.
//! Nodes own their children exclusively; deep copy via `Clone` is the only
//! sharing primitive (function bodies are cloned into the function table).

use std::fmt;

// =============================================================================
// POSITIONS
// =============================================================================

/// A position in the source text. `line` and `column` start at 1;
/// a zeroed position means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

/// A half-open range of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub begin: Position,
    pub end: Position,
}

// =============================================================================
// WORDS
// =============================================================================

/// A word is a tree of strings, quoted lists and substitutions. After the
/// expansion engine has run, only `String` and `List` variants remain.
#[derive(Debug, Clone, PartialEq)]
pub enum Word {
    String(WordString),
    Parameter(WordParameter),
    Command(WordCommand),
    Arithmetic(WordArithmetic),
    List(WordList),
}

/// Literal text.
#[derive(Debug, Clone, PartialEq)]
pub struct WordString {
    pub text: String,
    pub single_quoted: bool,
    /// Set only on substitution results produced outside double quotes:
    /// field splitting applies to those alone, never to parser literals.
    pub split_fields: bool,
    pub range: Range,
}

/// Parameter expansion operators, `${name<op>arg}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOp {
    /// `$name` or `${name}`
    None,
    /// `-`: use default value
    Minus,
    /// `=`: assign default value
    Equal,
    /// `?`: indicate error if null or unset
    QMark,
    /// `+`: use alternative value
    Plus,
    /// `%`: remove smallest suffix pattern
    Percent,
    /// `%%`: remove largest suffix pattern
    DPercent,
    /// `#`: remove smallest prefix pattern
    Hash,
    /// `##`: remove largest prefix pattern
    DHash,
    /// `${#name}`: string length
    LeadingHash,
}

impl ParamOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamOp::None => "",
            ParamOp::Minus => "-",
            ParamOp::Equal => "=",
            ParamOp::QMark => "?",
            ParamOp::Plus => "+",
            ParamOp::Percent => "%",
            ParamOp::DPercent => "%%",
            ParamOp::Hash => "#",
            ParamOp::DHash => "##",
            ParamOp::LeadingHash => "#",
        }
    }
}

/// `$name`, `${name}`, `${name<op>[arg]}` or `${#name}`.
#[derive(Debug, Clone, PartialEq)]
pub struct WordParameter {
    pub name: String,
    pub op: ParamOp,
    /// True for the `:-`/`:=`/`:?`/`:+` null-or-unset variants.
    pub colon: bool,
    pub arg: Option<Box<Word>>,
    pub dollar_pos: Position,
    pub name_range: Range,
    pub op_range: Range,
    pub lbrace_pos: Position,
    pub rbrace_pos: Position,
}

impl WordParameter {
    pub fn new(name: impl Into<String>) -> WordParameter {
        WordParameter {
            name: name.into(),
            op: ParamOp::None,
            colon: false,
            arg: None,
            dollar_pos: Position::default(),
            name_range: Range::default(),
            op_range: Range::default(),
            lbrace_pos: Position::default(),
            rbrace_pos: Position::default(),
        }
    }
}

/// Command substitution, `$(...)` or `` `...` ``.
#[derive(Debug, Clone, PartialEq)]
pub struct WordCommand {
    pub program: Option<Program>,
    pub back_quoted: bool,
    pub range: Range,
}

/// Arithmetic expansion, `$((...))`. The body is an unparsed word because it
/// may itself contain parameter and command substitutions; it is expanded,
/// then parsed and evaluated, at expansion time.
#[derive(Debug, Clone, PartialEq)]
pub struct WordArithmetic {
    pub body: Box<Word>,
}

/// An ordered list of child words. `double_quoted` lists are not subject to
/// field splitting or pathname expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct WordList {
    pub children: Vec<Word>,
    pub double_quoted: bool,
    pub lquote_pos: Position,
    pub rquote_pos: Position,
}

impl Word {
    pub fn new_string(text: impl Into<String>) -> Word {
        Word::String(WordString {
            text: text.into(),
            single_quoted: false,
            split_fields: false,
            range: Range::default(),
        })
    }

    /// A substitution result produced outside double quotes, eligible for
    /// field splitting.
    pub fn new_substitution(text: impl Into<String>) -> Word {
        Word::String(WordString {
            text: text.into(),
            single_quoted: false,
            split_fields: true,
            range: Range::default(),
        })
    }

    pub fn new_single_quoted(text: impl Into<String>) -> Word {
        Word::String(WordString {
            text: text.into(),
            single_quoted: true,
            split_fields: false,
            range: Range::default(),
        })
    }

    /// A string that must survive field splitting as-is: a substitution
    /// result from a double-quoted context.
    pub fn new_unsplit(text: impl Into<String>) -> Word {
        Word::String(WordString {
            text: text.into(),
            single_quoted: false,
            split_fields: false,
            range: Range::default(),
        })
    }

    pub fn new_list(children: Vec<Word>, double_quoted: bool) -> Word {
        Word::List(WordList {
            children,
            double_quoted,
            lquote_pos: Position::default(),
            rquote_pos: Position::default(),
        })
    }

    /// Wrap `children` in an unquoted list, unless there is exactly one child,
    /// which is returned directly to preserve its quoting bits. Unquoted
    /// lists of unquoted children do not nest.
    pub fn from_children(mut children: Vec<Word>) -> Word {
        if children.len() == 1 {
            return children.remove(0);
        }
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Word::List(l) if !l.double_quoted => flat.extend(l.children),
                other => flat.push(other),
            }
        }
        Word::new_list(flat, false)
    }

    /// Concatenate the literal content of an expanded word. Only meaningful
    /// on `String` and `List` variants.
    pub fn str(&self) -> String {
        let mut out = String::new();
        self.collect_str(&mut out);
        out
    }

    fn collect_str(&self, out: &mut String) {
        match self {
            Word::String(ws) => out.push_str(&ws.text),
            Word::List(wl) => {
                for child in &wl.children {
                    child.collect_str(out);
                }
            }
            Word::Parameter(_) | Word::Command(_) | Word::Arithmetic(_) => {
                debug_assert!(false, "Word::str on unexpanded word");
            }
        }
    }

    /// The source range covered by this word.
    pub fn range(&self) -> Range {
        match self {
            Word::String(ws) => ws.range,
            Word::Parameter(wp) => Range {
                begin: wp.dollar_pos,
                end: if wp.rbrace_pos.is_valid() {
                    wp.rbrace_pos
                } else {
                    wp.name_range.end
                },
            },
            Word::Command(wc) => wc.range,
            Word::Arithmetic(wa) => wa.body.range(),
            Word::List(wl) => {
                if wl.lquote_pos.is_valid() {
                    Range { begin: wl.lquote_pos, end: wl.rquote_pos }
                } else {
                    let begin =
                        wl.children.first().map(|w| w.range().begin).unwrap_or_default();
                    let end =
                        wl.children.last().map(|w| w.range().end).unwrap_or_default();
                    Range { begin, end }
                }
            }
        }
    }

    /// True if any part of the word is quoted. Decides whether here-document
    /// bodies are taken literally.
    pub fn is_quoted(&self) -> bool {
        match self {
            Word::String(ws) => ws.single_quoted,
            Word::List(wl) => {
                wl.double_quoted || wl.children.iter().any(|c| c.is_quoted())
            }
            _ => false,
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// The command sum type. Adding a variant will not compile until every match
/// site has been updated.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCommand),
    BraceGroup(BraceGroup),
    Subshell(Subshell),
    If(IfClause),
    For(ForClause),
    Loop(LoopClause),
    Case(CaseClause),
    FunctionDefinition(FunctionDefinition),
}

/// `[assignments...] [name [arguments...]] [redirects...]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleCommand {
    /// None for a bare-assignment command.
    pub name: Option<Word>,
    pub arguments: Vec<Word>,
    pub assignments: Vec<Assignment>,
    pub io_redirects: Vec<IoRedirect>,
}

/// `{ body; }`
#[derive(Debug, Clone, PartialEq)]
pub struct BraceGroup {
    pub body: Vec<CommandList>,
    pub lbrace_pos: Position,
    pub rbrace_pos: Position,
}

/// `( body )`
#[derive(Debug, Clone, PartialEq)]
pub struct Subshell {
    pub body: Vec<CommandList>,
    pub lparen_pos: Position,
    pub rparen_pos: Position,
}

/// `if condition; then body; [else ...] fi`. An `elif` chain is encoded as a
/// nested `IfClause` in `else_part`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Vec<CommandList>,
    pub body: Vec<CommandList>,
    pub else_part: Option<Box<Command>>,
    pub if_pos: Position,
    pub then_pos: Position,
    pub fi_pos: Position,
}

/// `for name [in words...]; do body; done`
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause {
    pub name: String,
    /// Whether an `in` clause was present. Without one the loop iterates
    /// over the positional parameters.
    pub in_word: bool,
    pub word_list: Vec<Word>,
    pub body: Vec<CommandList>,
    pub for_pos: Position,
    pub name_pos: Position,
    pub in_pos: Position,
    pub do_pos: Position,
    pub done_pos: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    Until,
}

/// `while`/`until condition; do body; done`
#[derive(Debug, Clone, PartialEq)]
pub struct LoopClause {
    pub kind: LoopKind,
    pub condition: Vec<CommandList>,
    pub body: Vec<CommandList>,
    pub begin: Position,
    pub do_pos: Position,
    pub done_pos: Position,
}

/// `case word in items... esac`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub word: Word,
    pub items: Vec<CaseItem>,
    pub case_pos: Position,
    pub in_pos: Position,
    pub esac_pos: Position,
}

/// One `(pattern | pattern) body ;;` item.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub body: Vec<CommandList>,
    pub lparen_pos: Option<Position>,
    /// Range of the `;;` terminator; zeroed for the final item when the
    /// terminator is omitted before `esac`.
    pub dsemi_range: Range,
}

/// `name ( ) compound-command`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub body: Box<Command>,
    pub name_pos: Position,
    pub lparen_pos: Position,
    pub rparen_pos: Position,
}

// =============================================================================
// NODES, LISTS, PROGRAM
// =============================================================================

/// And-or-list level: a pipeline, or `&&`/`||` over two nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Pipeline(Pipeline),
    Binop(Binop),
}

/// `[!] cmd1 | cmd2 | ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    /// Negate the exit status.
    pub bang: bool,
    pub bang_pos: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinopKind {
    /// `&&`
    And,
    /// `||`
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binop {
    pub kind: BinopKind,
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub op_pos: Position,
}

/// One and-or list with its separator: `node [& or ;]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandList {
    pub node: Node,
    /// Asynchronous execution (`&`).
    pub ampersand: bool,
    pub separator_pos: Option<Position>,
}

/// A complete program: an ordered sequence of command lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<CommandList>,
}

// =============================================================================
// REDIRECTIONS & ASSIGNMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoRedirectOp {
    /// `<`
    Less,
    /// `>`
    Great,
    /// `>|`
    Clobber,
    /// `>>`
    DGreat,
    /// `<&`
    LessAnd,
    /// `>&`
    GreatAnd,
    /// `<>`
    LessGreat,
    /// `<<`
    DLess,
    /// `<<-`
    DLessDash,
}

impl IoRedirectOp {
    pub fn is_here_document(&self) -> bool {
        matches!(self, IoRedirectOp::DLess | IoRedirectOp::DLessDash)
    }
}

impl fmt::Display for IoRedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoRedirectOp::Less => "<",
            IoRedirectOp::Great => ">",
            IoRedirectOp::Clobber => ">|",
            IoRedirectOp::DGreat => ">>",
            IoRedirectOp::LessAnd => "<&",
            IoRedirectOp::GreatAnd => ">&",
            IoRedirectOp::LessGreat => "<>",
            IoRedirectOp::DLess => "<<",
            IoRedirectOp::DLessDash => "<<-",
        };
        write!(f, "{}", s)
    }
}

/// `[io_number]op name`, plus the body lines for here-document operators.
#[derive(Debug, Clone, PartialEq)]
pub struct IoRedirect {
    pub io_number: Option<i32>,
    pub op: IoRedirectOp,
    /// Filename, FD number, or here-document delimiter.
    pub name: Word,
    /// Body lines, filled in on the here-document pass after the newline
    /// terminating the containing complete command.
    pub here_document: Vec<Word>,
    pub op_range: Range,
    pub io_number_pos: Option<Position>,
}

/// `name=value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
    pub name_pos: Position,
    pub equal_pos: Position,
}
