//! AST Formatting
//!
//! Renders AST nodes back to shell source text. Used by the `jobs` builtin to
//! display a job's command, by `%prefix`/`%?substr` job lookup, and by tests
//! as a position-insensitive structural fingerprint: formatting is a fixpoint
//! under reparsing.

use crate::ast::types::*;

/// Characters that must be escaped when printing an unquoted literal so that
/// reparsing yields the same word.
fn is_unquoted_special(c: char) -> bool {
    matches!(
        c,
        '|' | '&' | ';' | '<' | '>' | '(' | ')' | '$' | '`' | '\\' | '"' | '\''
            | ' ' | '\t' | '\n' | '*' | '?' | '[' | '#' | '~'
    )
}

fn push_unquoted(out: &mut String, text: &str) {
    for c in text.chars() {
        if is_unquoted_special(c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn push_double_quoted(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '$' | '`' | '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

pub fn format_word(word: &Word) -> String {
    let mut out = String::new();
    push_word(&mut out, word, false);
    out
}

fn push_word(out: &mut String, word: &Word, double_quoted: bool) {
    match word {
        Word::String(ws) => {
            if ws.single_quoted {
                out.push('\'');
                out.push_str(&ws.text);
                out.push('\'');
            } else if double_quoted {
                push_double_quoted(out, &ws.text);
            } else {
                push_unquoted(out, &ws.text);
            }
        }
        Word::Parameter(wp) => {
            out.push('$');
            if wp.op == ParamOp::None && wp.arg.is_none() {
                out.push_str(&wp.name);
            } else if wp.op == ParamOp::LeadingHash {
                out.push('{');
                out.push('#');
                out.push_str(&wp.name);
                out.push('}');
            } else {
                out.push('{');
                out.push_str(&wp.name);
                if wp.colon {
                    out.push(':');
                }
                out.push_str(wp.op.as_str());
                if let Some(arg) = &wp.arg {
                    push_word(out, arg, false);
                }
                out.push('}');
            }
        }
        Word::Command(wc) => {
            let body = match &wc.program {
                Some(program) => format_program(program),
                None => String::new(),
            };
            if wc.back_quoted {
                out.push('`');
                out.push_str(&body);
                out.push('`');
            } else {
                out.push_str("$(");
                out.push_str(&body);
                out.push(')');
            }
        }
        Word::Arithmetic(wa) => {
            out.push_str("$((");
            push_word(out, &wa.body, true);
            out.push_str("))");
        }
        Word::List(wl) => {
            if wl.double_quoted {
                out.push('"');
                for child in &wl.children {
                    push_word(out, child, true);
                }
                out.push('"');
            } else {
                for child in &wl.children {
                    push_word(out, child, double_quoted);
                }
            }
        }
    }
}

fn push_io_redirect(out: &mut String, redir: &IoRedirect) {
    if let Some(n) = redir.io_number {
        out.push_str(&n.to_string());
    }
    out.push_str(&redir.op.to_string());
    push_word(out, &redir.name, false);
}

fn push_simple_command(out: &mut String, sc: &SimpleCommand) {
    let mut sep = "";
    for assign in &sc.assignments {
        out.push_str(sep);
        out.push_str(&assign.name);
        out.push('=');
        push_word(out, &assign.value, false);
        sep = " ";
    }
    if let Some(name) = &sc.name {
        out.push_str(sep);
        push_word(out, name, false);
        sep = " ";
    }
    for arg in &sc.arguments {
        out.push_str(sep);
        push_word(out, arg, false);
        sep = " ";
    }
    for redir in &sc.io_redirects {
        out.push_str(sep);
        push_io_redirect(out, redir);
        sep = " ";
    }
}

fn push_body(out: &mut String, body: &[CommandList]) {
    for list in body {
        push_node(out, &list.node);
        out.push_str(if list.ampersand { " & " } else { "; " });
    }
}

fn push_command(out: &mut String, cmd: &Command) {
    match cmd {
        Command::Simple(sc) => push_simple_command(out, sc),
        Command::BraceGroup(bg) => {
            out.push_str("{ ");
            push_body(out, &bg.body);
            out.push('}');
        }
        Command::Subshell(s) => {
            out.push('(');
            push_body(out, &s.body);
            out.push(')');
        }
        Command::If(ic) => push_if_clause(out, ic),
        Command::For(fc) => {
            out.push_str("for ");
            out.push_str(&fc.name);
            if fc.in_word {
                out.push_str(" in");
                for w in &fc.word_list {
                    out.push(' ');
                    push_word(out, w, false);
                }
            }
            out.push_str("; do ");
            push_body(out, &fc.body);
            out.push_str("done");
        }
        Command::Loop(lc) => {
            out.push_str(match lc.kind {
                LoopKind::While => "while ",
                LoopKind::Until => "until ",
            });
            push_body(out, &lc.condition);
            out.push_str("do ");
            push_body(out, &lc.body);
            out.push_str("done");
        }
        Command::Case(cc) => {
            out.push_str("case ");
            push_word(out, &cc.word, false);
            out.push_str(" in ");
            for item in &cc.items {
                out.push('(');
                let mut sep = "";
                for pattern in &item.patterns {
                    out.push_str(sep);
                    push_word(out, pattern, false);
                    sep = " | ";
                }
                out.push_str(") ");
                push_body(out, &item.body);
                out.push_str(";; ");
            }
            out.push_str("esac");
        }
        Command::FunctionDefinition(fd) => {
            out.push_str(&fd.name);
            out.push_str("() ");
            push_command(out, &fd.body);
        }
    }
}

fn push_if_clause(out: &mut String, ic: &IfClause) {
    out.push_str("if ");
    push_body(out, &ic.condition);
    out.push_str("then ");
    push_body(out, &ic.body);
    match ic.else_part.as_deref() {
        Some(Command::If(elif)) => {
            out.push_str("el");
            push_if_clause(out, elif);
            return;
        }
        Some(cmd) => {
            // An else branch is stored as a brace group; print its body bare.
            out.push_str("else ");
            if let Command::BraceGroup(bg) = cmd {
                push_body(out, &bg.body);
            } else {
                push_command(out, cmd);
                out.push_str("; ");
            }
        }
        None => {}
    }
    out.push_str("fi");
}

fn push_node(out: &mut String, node: &Node) {
    match node {
        Node::Pipeline(pl) => {
            if pl.bang {
                out.push_str("! ");
            }
            let mut sep = "";
            for cmd in &pl.commands {
                out.push_str(sep);
                push_command(out, cmd);
                sep = " | ";
            }
        }
        Node::Binop(binop) => {
            push_node(out, &binop.left);
            out.push_str(match binop.kind {
                BinopKind::And => " && ",
                BinopKind::Or => " || ",
            });
            push_node(out, &binop.right);
        }
    }
}

pub fn format_node(node: &Node) -> String {
    let mut out = String::new();
    push_node(&mut out, node);
    out
}

pub fn format_command(cmd: &Command) -> String {
    let mut out = String::new();
    push_command(&mut out, cmd);
    out
}

pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for (i, list) in program.body.iter().enumerate() {
        push_node(&mut out, &list.node);
        if list.ampersand {
            out.push_str(" &");
        }
        if i + 1 < program.body.len() {
            out.push_str("; ");
        }
    }
    out
}
