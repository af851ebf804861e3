//! `umask`: display or set the file mode creation mask. Setting accepts
//! octal modes; `-S` displays the symbolic form.

use crate::builtins::usage_error;
use crate::interp::{Context, TaskStatus};
use crate::shell::os;

fn symbolic(mask: os::mode_t) -> String {
    let mut out = String::new();
    for (who, shift) in [('u', 6), ('g', 3), ('o', 0)] {
        out.push(who);
        out.push('=');
        let bits = (!mask >> shift) & 0o7;
        if bits & 0o4 != 0 {
            out.push('r');
        }
        if bits & 0o2 != 0 {
            out.push('w');
        }
        if bits & 0o1 != 0 {
            out.push('x');
        }
        out.push(',');
    }
    out.pop();
    out
}

pub fn builtin_umask(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut operands = &argv[1..];
    let mut show_symbolic = false;
    if operands.first().map(|s| s.as_str()) == Some("-S") {
        show_symbolic = true;
        operands = &operands[1..];
    }

    match operands.first() {
        None => {
            // Reading the mask means setting it twice.
            let mask = os::umask(0);
            os::umask(mask);
            if show_symbolic {
                println!("{}", symbolic(mask));
            } else {
                println!("{:04o}", mask);
            }
            TaskStatus::Exit(0)
        }
        Some(operand) => {
            let Ok(mask) = u32::from_str_radix(operand, 8) else {
                eprintln!(
                    "{}: umask: {}: expected an octal mode",
                    ctx.state.name(),
                    operand
                );
                return TaskStatus::Exit(1);
            };
            if mask > 0o777 {
                return usage_error(ctx, "umask [-S] [mode]");
            }
            os::umask(mask as os::mode_t);
            TaskStatus::Exit(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic() {
        assert_eq!(symbolic(0o022), "u=rwx,g=rx,o=rx");
        assert_eq!(symbolic(0o077), "u=rwx,g=,o=");
        assert_eq!(symbolic(0o000), "u=rwx,g=rwx,o=rwx");
    }
}
