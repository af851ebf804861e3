//! `read`: read one line from standard input, split it on `$IFS`, and
//! assign the fields to the named variables. Without `-r`, backslash
//! escapes the next character and a backslash-newline continues the line.

use crate::builtins::usage_error;
use crate::interp::expansion::field_split::DEFAULT_IFS;
use crate::interp::{Context, TaskStatus};
use crate::shell::os;
use crate::shell::state::VAR_ATTRIB_NONE;

/// Read one logical line from fd 0, byte by byte so no lookahead is
/// consumed. Returns None at end of input with nothing read.
fn read_line(raw: bool) -> Option<String> {
    let mut line = String::new();
    let mut got_any = false;
    let mut escaped = false;
    loop {
        let mut byte = [0u8; 1];
        let n = os::read_fd(0, &mut byte).unwrap_or(0);
        if n == 0 {
            if got_any {
                return Some(line);
            }
            return None;
        }
        got_any = true;
        let c = byte[0] as char;

        if escaped {
            escaped = false;
            if c == '\n' {
                // Line continuation
                continue;
            }
            line.push(c);
            continue;
        }
        if !raw && c == '\\' {
            escaped = true;
            continue;
        }
        if c == '\n' {
            return Some(line);
        }
        line.push(c);
    }
}

/// Split `line` into at most `n` fields by the IFS rules; the last field
/// keeps the remainder with trailing IFS whitespace removed.
fn split_for_read(line: &str, ifs: &str, n: usize) -> Vec<String> {
    let whitespace: Vec<char> =
        ifs.chars().filter(|c| matches!(c, ' ' | '\t' | '\n')).collect();
    let non_space: Vec<char> =
        ifs.chars().filter(|c| !matches!(c, ' ' | '\t' | '\n')).collect();

    let mut fields = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut pos = 0;

    while fields.len() < n {
        // Skip leading IFS whitespace.
        while pos < chars.len() && whitespace.contains(&chars[pos]) {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }

        if fields.len() + 1 == n {
            // The last variable takes the rest of the line, minus trailing
            // IFS whitespace.
            let rest: String = chars[pos..].iter().collect();
            let trimmed = rest
                .trim_end_matches(|c| whitespace.contains(&c))
                .to_string();
            fields.push(trimmed);
            return fields;
        }

        let start = pos;
        while pos < chars.len()
            && !whitespace.contains(&chars[pos])
            && !non_space.contains(&chars[pos])
        {
            pos += 1;
        }
        fields.push(chars[start..pos].iter().collect());

        // Consume one delimiter: whitespace run, optionally one
        // non-whitespace IFS char, more whitespace.
        while pos < chars.len() && whitespace.contains(&chars[pos]) {
            pos += 1;
        }
        if pos < chars.len() && non_space.contains(&chars[pos]) {
            pos += 1;
        }
    }

    fields
}

pub fn builtin_read(ctx: &mut Context, argv: &[String]) -> TaskStatus {
    let mut raw = false;
    let mut operands = &argv[1..];
    if operands.first().map(|s| s.as_str()) == Some("-r") {
        raw = true;
        operands = &operands[1..];
    }
    if operands.is_empty() {
        return usage_error(ctx, "read [-r] var...");
    }

    let Some(line) = read_line(raw) else {
        // End of input: the variables are still cleared.
        for name in operands {
            let _ = ctx.state.env_set(name, "", VAR_ATTRIB_NONE);
        }
        return TaskStatus::Exit(1);
    };

    let ifs = ctx
        .state
        .env_get_value("IFS")
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_IFS.to_string());
    let fields = split_for_read(&line, &ifs, operands.len());

    for (i, name) in operands.iter().enumerate() {
        let value = fields.get(i).map(|s| s.as_str()).unwrap_or("");
        if ctx.state.env_set(name, value, VAR_ATTRIB_NONE).is_err() {
            eprintln!(
                "{}: read: cannot modify readonly variable {}",
                ctx.state.name(),
                name
            );
            return TaskStatus::Exit(1);
        }
    }

    TaskStatus::Exit(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        assert_eq!(split_for_read("a b c", " \t\n", 3), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_last_field_takes_rest() {
        assert_eq!(split_for_read("a b c d", " \t\n", 2), vec!["a", "b c d"]);
        assert_eq!(split_for_read("a b c  ", " \t\n", 2), vec!["a", "b c"]);
    }

    #[test]
    fn test_non_whitespace_delimiter() {
        assert_eq!(split_for_read("a:b", ": ", 3), vec!["a", "b"]);
        assert_eq!(split_for_read("a : b", ": ", 3), vec!["a", "b"]);
    }

    #[test]
    fn test_fewer_fields_than_vars() {
        assert_eq!(split_for_read("one", " \t\n", 3), vec!["one"]);
    }
}
