//! Arithmetic Evaluation
//!
//! Expands the body of `$((...))` to a string, parses it, and evaluates it
//! with signed 64-bit wrapping semantics. `&&` and `||` short-circuit;
//! assignment operators update named shell variables. Division and modulo
//! by zero are runtime errors.

use crate::ast::WordArithmetic;
use crate::interp::expansion::run_word;
use crate::interp::{Context, TaskStatus};
use crate::parser::arith::{
    parse_arithmetic, ArithAssignOp, ArithBinop, ArithExpr, ArithUnop,
};
use crate::shell::state::ShellState;
use crate::shell::VAR_ATTRIB_NONE;

/// Expand, parse and evaluate an arithmetic word, yielding its decimal
/// result.
pub(crate) fn run_word_arithmetic(
    ctx: &mut Context,
    wa: &WordArithmetic,
) -> Result<String, TaskStatus> {
    let mut body = (*wa.body).clone();
    run_word(ctx, &mut body, true)?;
    let src = body.str();

    let expr = parse_arithmetic(&src).map_err(|msg| {
        eprintln!("{}: arithmetic: {}", ctx.state.name(), msg);
        TaskStatus::Error
    })?;

    let value = eval_arithmetic(ctx.state, &expr).map_err(|msg| {
        eprintln!("{}: arithmetic: {}", ctx.state.name(), msg);
        TaskStatus::Error
    })?;

    Ok(value.to_string())
}

fn variable_value(state: &ShellState, name: &str) -> Result<i64, String> {
    match state.env_get_value(name) {
        None => {
            if state.options.nounset {
                return Err(format!("{}: unbound variable", name));
            }
            Ok(0)
        }
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| format!("{}: not a number: {}", name, value))
        }
    }
}

fn eval_binop(op: ArithBinop, left: i64, right: i64) -> Result<i64, String> {
    let value = match op {
        ArithBinop::Mul => left.wrapping_mul(right),
        ArithBinop::Div => {
            if right == 0 {
                return Err(format!("division by zero: {}/{}", left, right));
            }
            left.wrapping_div(right)
        }
        ArithBinop::Mod => {
            if right == 0 {
                return Err(format!("division by zero: {}%{}", left, right));
            }
            left.wrapping_rem(right)
        }
        ArithBinop::Add => left.wrapping_add(right),
        ArithBinop::Sub => left.wrapping_sub(right),
        ArithBinop::Shl => left.wrapping_shl(right as u32),
        ArithBinop::Shr => left.wrapping_shr(right as u32),
        ArithBinop::Lt => (left < right) as i64,
        ArithBinop::Le => (left <= right) as i64,
        ArithBinop::Gt => (left > right) as i64,
        ArithBinop::Ge => (left >= right) as i64,
        ArithBinop::Eq => (left == right) as i64,
        ArithBinop::Ne => (left != right) as i64,
        ArithBinop::BitAnd => left & right,
        ArithBinop::BitXor => left ^ right,
        ArithBinop::BitOr => left | right,
        ArithBinop::LogAnd | ArithBinop::LogOr => unreachable!("short-circuited"),
    };
    Ok(value)
}

pub fn eval_arithmetic(state: &mut ShellState, expr: &ArithExpr) -> Result<i64, String> {
    match expr {
        ArithExpr::Literal(value) => Ok(*value),
        ArithExpr::Variable(name) => variable_value(state, name),
        ArithExpr::Unop { op, body } => {
            let value = eval_arithmetic(state, body)?;
            Ok(match op {
                ArithUnop::Plus => value,
                ArithUnop::Minus => value.wrapping_neg(),
                ArithUnop::Tilde => !value,
                ArithUnop::Bang => (value == 0) as i64,
            })
        }
        ArithExpr::Binop { op: ArithBinop::LogAnd, left, right } => {
            if eval_arithmetic(state, left)? == 0 {
                return Ok(0);
            }
            Ok((eval_arithmetic(state, right)? != 0) as i64)
        }
        ArithExpr::Binop { op: ArithBinop::LogOr, left, right } => {
            if eval_arithmetic(state, left)? != 0 {
                return Ok(1);
            }
            Ok((eval_arithmetic(state, right)? != 0) as i64)
        }
        ArithExpr::Binop { op, left, right } => {
            let left = eval_arithmetic(state, left)?;
            let right = eval_arithmetic(state, right)?;
            eval_binop(*op, left, right)
        }
        ArithExpr::Cond { condition, body, else_part } => {
            if eval_arithmetic(state, condition)? != 0 {
                eval_arithmetic(state, body)
            } else {
                eval_arithmetic(state, else_part)
            }
        }
        ArithExpr::Assign { op, name, value } => {
            let value = eval_arithmetic(state, value)?;
            let result = if *op == ArithAssignOp::None {
                value
            } else {
                let current = variable_value(state, name)?;
                match op {
                    ArithAssignOp::Mul => eval_binop(ArithBinop::Mul, current, value)?,
                    ArithAssignOp::Div => eval_binop(ArithBinop::Div, current, value)?,
                    ArithAssignOp::Mod => eval_binop(ArithBinop::Mod, current, value)?,
                    ArithAssignOp::Add => eval_binop(ArithBinop::Add, current, value)?,
                    ArithAssignOp::Sub => eval_binop(ArithBinop::Sub, current, value)?,
                    ArithAssignOp::Shl => eval_binop(ArithBinop::Shl, current, value)?,
                    ArithAssignOp::Shr => eval_binop(ArithBinop::Shr, current, value)?,
                    ArithAssignOp::And => current & value,
                    ArithAssignOp::Xor => current ^ value,
                    ArithAssignOp::Or => current | value,
                    ArithAssignOp::None => unreachable!(),
                }
            };
            state
                .env_set(name, &result.to_string(), VAR_ATTRIB_NONE)
                .map_err(|_| format!("cannot modify readonly variable {}", name))?;
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(state: &mut ShellState, src: &str) -> Result<i64, String> {
        let expr = parse_arithmetic(src)?;
        eval_arithmetic(state, &expr)
    }

    fn state() -> ShellState {
        ShellState::new(vec!["test-sh".to_string()])
    }

    #[test]
    fn test_basic_arithmetic() {
        let mut state = state();
        assert_eq!(eval_str(&mut state, "1 + 2 * 3").unwrap(), 7);
        assert_eq!(eval_str(&mut state, "(1 + 2) * 3").unwrap(), 9);
        assert_eq!(eval_str(&mut state, "7 / 2").unwrap(), 3);
        assert_eq!(eval_str(&mut state, "7 % 2").unwrap(), 1);
        assert_eq!(eval_str(&mut state, "-3 + 1").unwrap(), -2);
    }

    #[test]
    fn test_comparisons_and_logic() {
        let mut state = state();
        assert_eq!(eval_str(&mut state, "1 < 2").unwrap(), 1);
        assert_eq!(eval_str(&mut state, "2 <= 1").unwrap(), 0);
        assert_eq!(eval_str(&mut state, "1 && 2").unwrap(), 1);
        assert_eq!(eval_str(&mut state, "0 || 0").unwrap(), 0);
        assert_eq!(eval_str(&mut state, "!0").unwrap(), 1);
    }

    #[test]
    fn test_short_circuit_skips_division_by_zero() {
        let mut state = state();
        assert_eq!(eval_str(&mut state, "0 && 1 / 0").unwrap(), 0);
        assert_eq!(eval_str(&mut state, "1 || 1 / 0").unwrap(), 1);
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let mut state = state();
        assert!(eval_str(&mut state, "1 / 0").is_err());
        assert!(eval_str(&mut state, "1 % 0").is_err());
    }

    #[test]
    fn test_variables() {
        let mut state = state();
        state.env_set("x", "5", VAR_ATTRIB_NONE).unwrap();
        assert_eq!(eval_str(&mut state, "x * 2").unwrap(), 10);
        // Unset variables evaluate to zero.
        assert_eq!(eval_str(&mut state, "y + 1").unwrap(), 1);
        assert!(eval_str(&mut state, "x / y").is_err());
    }

    #[test]
    fn test_assignment_updates_variable() {
        let mut state = state();
        assert_eq!(eval_str(&mut state, "x = 3 + 4").unwrap(), 7);
        assert_eq!(state.env_get_value("x"), Some("7"));
        assert_eq!(eval_str(&mut state, "x += 3").unwrap(), 10);
        assert_eq!(state.env_get_value("x"), Some("10"));
    }

    #[test]
    fn test_ternary() {
        let mut state = state();
        assert_eq!(eval_str(&mut state, "1 ? 10 : 20").unwrap(), 10);
        assert_eq!(eval_str(&mut state, "0 ? 10 : 20").unwrap(), 20);
    }

    #[test]
    fn test_overflow_wraps() {
        let mut state = state();
        state
            .env_set("max", &i64::MAX.to_string(), VAR_ATTRIB_NONE)
            .unwrap();
        assert_eq!(eval_str(&mut state, "max + 1").unwrap(), i64::MIN);
    }

    #[test]
    fn test_not_a_number_is_error() {
        let mut state = state();
        state.env_set("s", "hello", VAR_ATTRIB_NONE).unwrap();
        assert!(eval_str(&mut state, "s + 1").is_err());
    }
}
