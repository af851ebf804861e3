//! Arithmetic Expression Parser
//!
//! Parses the body of `$((...))` after it has been expanded to a plain
//! string (POSIX §2.6.4: signed long arithmetic with the C operator set).
//! Precedence climbing over a small token scanner; evaluation happens in the
//! expansion engine where shell variables are in reach.

/// Arithmetic AST. Assignment operators update named shell variables at
/// evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Literal(i64),
    Variable(String),
    Unop { op: ArithUnop, body: Box<ArithExpr> },
    Binop { op: ArithBinop, left: Box<ArithExpr>, right: Box<ArithExpr> },
    Cond { condition: Box<ArithExpr>, body: Box<ArithExpr>, else_part: Box<ArithExpr> },
    Assign { op: ArithAssignOp, name: String, value: Box<ArithExpr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnop {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `~`
    Tilde,
    /// `!`
    Bang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinop {
    Mul, Div, Mod,
    Add, Sub,
    Shl, Shr,
    Lt, Le, Gt, Ge,
    Eq, Ne,
    BitAnd, BitXor, BitOr,
    LogAnd, LogOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithAssignOp {
    None,
    Mul, Div, Mod,
    Add, Sub,
    Shl, Shr,
    And, Xor, Or,
}

/// Binary operator levels, loosest first. `&&`/`||` short-circuit at
/// evaluation time.
const BINOP_LEVELS: &[&[(&str, ArithBinop)]] = &[
    &[("||", ArithBinop::LogOr)],
    &[("&&", ArithBinop::LogAnd)],
    &[("|", ArithBinop::BitOr)],
    &[("^", ArithBinop::BitXor)],
    &[("&", ArithBinop::BitAnd)],
    &[("==", ArithBinop::Eq), ("!=", ArithBinop::Ne)],
    &[
        ("<=", ArithBinop::Le),
        (">=", ArithBinop::Ge),
        ("<", ArithBinop::Lt),
        (">", ArithBinop::Gt),
    ],
    &[("<<", ArithBinop::Shl), (">>", ArithBinop::Shr)],
    &[("+", ArithBinop::Add), ("-", ArithBinop::Sub)],
    &[("*", ArithBinop::Mul), ("/", ArithBinop::Div), ("%", ArithBinop::Mod)],
];

const ASSIGN_OPS: &[(&str, ArithAssignOp)] = &[
    ("<<=", ArithAssignOp::Shl),
    (">>=", ArithAssignOp::Shr),
    ("*=", ArithAssignOp::Mul),
    ("/=", ArithAssignOp::Div),
    ("%=", ArithAssignOp::Mod),
    ("+=", ArithAssignOp::Add),
    ("-=", ArithAssignOp::Sub),
    ("&=", ArithAssignOp::And),
    ("^=", ArithAssignOp::Xor),
    ("|=", ArithAssignOp::Or),
];

struct ArithParser<'a> {
    input: &'a [u8],
    pos: usize,
}

/// Parse an arithmetic expression from an expanded string.
pub fn parse_arithmetic(input: &str) -> Result<ArithExpr, String> {
    let mut parser = ArithParser { input: input.as_bytes(), pos: 0 };
    let expr = parser.expression()?;
    parser.skip_blanks();
    if parser.pos < parser.input.len() {
        return Err(format!(
            "unexpected character '{}' in arithmetic expression",
            parser.peek() as char
        ));
    }
    Ok(expr)
}

impl<'a> ArithParser<'a> {
    fn peek(&self) -> u8 {
        self.input.get(self.pos).copied().unwrap_or(0)
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), b' ' | b'\t' | b'\n') {
            self.pos += 1;
        }
    }

    /// Try to consume `str`, but not when it is a prefix of a longer
    /// operator (`<` vs `<<`, `&` vs `&&`, `|` vs `||`, `=` vs `==`).
    fn accept(&mut self, str: &str) -> bool {
        self.skip_blanks();
        let bytes = str.as_bytes();
        if self.input.len() - self.pos < bytes.len() {
            return false;
        }
        if &self.input[self.pos..self.pos + bytes.len()] != bytes {
            return false;
        }
        let next = self.input.get(self.pos + bytes.len()).copied().unwrap_or(0);
        let ambiguous = match str {
            "<" | ">" => next == b'=' || next == str.as_bytes()[0],
            "&" | "|" | "=" => next == str.as_bytes()[0],
            "!" => next == b'=',
            "<<" | ">>" | "*" | "/" | "%" | "+" | "-" | "^" => next == b'=',
            "==" | "!=" | "<=" | ">=" | "&&" | "||" => false,
            _ => false,
        };
        if ambiguous {
            return false;
        }
        self.pos += bytes.len();
        true
    }

    fn name(&mut self) -> Option<String> {
        self.skip_blanks();
        let start = self.pos;
        let mut i = self.pos;
        while i < self.input.len() {
            let c = self.input[i];
            if c != b'_' && !c.is_ascii_alphanumeric() {
                break;
            }
            if i == start && c.is_ascii_digit() {
                return None;
            }
            i += 1;
        }
        if i == start {
            return None;
        }
        self.pos = i;
        Some(String::from_utf8_lossy(&self.input[start..i]).into_owned())
    }

    fn literal(&mut self) -> Result<ArithExpr, String> {
        let start = self.pos;
        let (radix, digits_start) = if self.peek() == b'0' {
            match self.input.get(self.pos + 1) {
                Some(b'x') | Some(b'X') => (16, self.pos + 2),
                Some(c) if c.is_ascii_digit() => (8, self.pos + 1),
                _ => (10, self.pos),
            }
        } else {
            (10, self.pos)
        };

        self.pos = digits_start;
        while self.peek().is_ascii_alphanumeric() {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.input[digits_start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        i64::from_str_radix(digits, radix)
            .map(ArithExpr::Literal)
            .map_err(|_| {
                format!(
                    "invalid number '{}'",
                    String::from_utf8_lossy(&self.input[start..self.pos])
                )
            })
    }

    fn primary(&mut self) -> Result<ArithExpr, String> {
        self.skip_blanks();

        if self.accept("(") {
            let expr = self.expression()?;
            if !self.accept(")") {
                return Err("expected ')' in arithmetic expression".to_string());
            }
            return Ok(expr);
        }

        let c = self.peek();
        if c.is_ascii_digit() {
            return self.literal();
        }
        if let Some(name) = self.name() {
            return Ok(ArithExpr::Variable(name));
        }
        if c == 0 {
            return Err("expected an arithmetic expression".to_string());
        }
        Err(format!("unexpected character '{}' in arithmetic expression", c as char))
    }

    fn unary(&mut self) -> Result<ArithExpr, String> {
        self.skip_blanks();
        let op = if self.accept("+") {
            ArithUnop::Plus
        } else if self.accept("-") {
            ArithUnop::Minus
        } else if self.accept("~") {
            ArithUnop::Tilde
        } else if self.accept("!") {
            ArithUnop::Bang
        } else {
            return self.primary();
        };
        let body = self.unary()?;
        Ok(ArithExpr::Unop { op, body: Box::new(body) })
    }

    fn binary(&mut self, level: usize) -> Result<ArithExpr, String> {
        if level == BINOP_LEVELS.len() {
            return self.unary();
        }

        let mut left = self.binary(level + 1)?;
        'outer: loop {
            for (str, op) in BINOP_LEVELS[level] {
                if self.accept(str) {
                    let right = self.binary(level + 1)?;
                    left = ArithExpr::Binop {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn ternary(&mut self) -> Result<ArithExpr, String> {
        let condition = self.binary(0)?;
        if !self.accept("?") {
            return Ok(condition);
        }
        let body = self.expression()?;
        if !self.accept(":") {
            return Err("expected ':' in conditional expression".to_string());
        }
        let else_part = self.ternary()?;
        Ok(ArithExpr::Cond {
            condition: Box::new(condition),
            body: Box::new(body),
            else_part: Box::new(else_part),
        })
    }

    fn expression(&mut self) -> Result<ArithExpr, String> {
        // Assignments need lookahead: a name followed by an assignment
        // operator, with `==` excluded by `accept`.
        let saved = self.pos;
        if let Some(name) = self.name() {
            if self.accept("=") {
                let value = self.expression()?;
                return Ok(ArithExpr::Assign {
                    op: ArithAssignOp::None,
                    name,
                    value: Box::new(value),
                });
            }
            for (str, op) in ASSIGN_OPS {
                if self.accept(str) {
                    let value = self.expression()?;
                    return Ok(ArithExpr::Assign {
                        op: *op,
                        name,
                        value: Box::new(value),
                    });
                }
            }
            self.pos = saved;
        }

        self.ternary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> ArithExpr {
        parse_arithmetic(src).unwrap_or_else(|e| panic!("{}: {}", src, e))
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_ok("42"), ArithExpr::Literal(42));
        assert_eq!(parse_ok("0x1f"), ArithExpr::Literal(31));
        assert_eq!(parse_ok("010"), ArithExpr::Literal(8));
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse_ok("1 + 2 * 3") {
            ArithExpr::Binop { op: ArithBinop::Add, right, .. } => {
                assert!(matches!(*right, ArithExpr::Binop { op: ArithBinop::Mul, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_shift_vs_comparison() {
        match parse_ok("1 << 2 < 3") {
            ArithExpr::Binop { op: ArithBinop::Lt, left, .. } => {
                assert!(matches!(*left, ArithExpr::Binop { op: ArithBinop::Shl, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unary() {
        match parse_ok("-x") {
            ArithExpr::Unop { op: ArithUnop::Minus, body } => {
                assert_eq!(*body, ArithExpr::Variable("x".to_string()));
            }
            other => panic!("unexpected: {:?}", other),
        }
        parse_ok("!~-+x");
    }

    #[test]
    fn test_ternary() {
        match parse_ok("a ? 1 : 2") {
            ArithExpr::Cond { .. } => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_assignment() {
        match parse_ok("x = 1 + 2") {
            ArithExpr::Assign { op: ArithAssignOp::None, name, .. } => {
                assert_eq!(name, "x");
            }
            other => panic!("unexpected: {:?}", other),
        }
        match parse_ok("x += 5") {
            ArithExpr::Assign { op: ArithAssignOp::Add, .. } => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_equality_is_not_assignment() {
        match parse_ok("x == 1") {
            ArithExpr::Binop { op: ArithBinop::Eq, .. } => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parens() {
        match parse_ok("(1 + 2) * 3") {
            ArithExpr::Binop { op: ArithBinop::Mul, left, .. } => {
                assert!(matches!(*left, ArithExpr::Binop { op: ArithBinop::Add, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        assert!(parse_arithmetic("").is_err());
        assert!(parse_arithmetic("1 +").is_err());
        assert!(parse_arithmetic("(1").is_err());
        assert!(parse_arithmetic("1 ? 2").is_err());
        assert!(parse_arithmetic("09").is_err());
    }
}
