//! Source Cursor
//!
//! A byte stream with lookahead over an in-memory buffer or a blocking
//! reader (the line-reader front-end hands the shell a `Read`). Tracks the
//! current position for diagnostics. EOF is modelled as a NUL terminator so
//! lookahead past the end is always safe.

use std::io::Read;

use crate::ast::Position;

const READ_SIZE: usize = 1024;

pub struct SourceCursor {
    /// Unread bytes. Once the backing stream is exhausted a single NUL
    /// sentinel is appended.
    buf: Vec<u8>,
    source: Option<Box<dyn Read>>,
    eof: bool,
    pos: Position,
    /// `set -v`: echo consumed input lines to stderr.
    verbose: bool,
    echo_buf: String,
}

impl SourceCursor {
    pub fn from_str(input: &str) -> SourceCursor {
        SourceCursor {
            buf: input.as_bytes().to_vec(),
            source: None,
            eof: false,
            pos: Position { offset: 0, line: 1, column: 1 },
            verbose: false,
            echo_buf: String::new(),
        }
    }

    pub fn from_reader(source: Box<dyn Read>) -> SourceCursor {
        SourceCursor {
            buf: Vec::new(),
            source: Some(source),
            eof: false,
            pos: Position { offset: 0, line: 1, column: 1 },
            verbose: false,
            echo_buf: String::new(),
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    fn echo(&mut self, b: u8) {
        if !self.verbose {
            return;
        }
        self.echo_buf.push(b as char);
        if b == b'\n' {
            eprint!("{}", self.echo_buf);
            self.echo_buf.clear();
        }
    }

    /// Position of the next unread byte.
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Make at least `n` bytes available, pulling from the backing stream as
    /// needed. The NUL sentinel counts once the stream ends.
    fn ensure(&mut self, n: usize) {
        while self.buf.len() < n && !self.eof {
            match &mut self.source {
                Some(source) => {
                    let mut chunk = [0u8; READ_SIZE];
                    match source.read(&mut chunk) {
                        Ok(0) => {
                            self.eof = true;
                            self.buf.push(0);
                        }
                        Ok(n_read) => self.buf.extend_from_slice(&chunk[..n_read]),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(_) => {
                            self.eof = true;
                            self.buf.push(0);
                        }
                    }
                }
                None => {
                    self.eof = true;
                    self.buf.push(0);
                }
            }
        }
    }

    /// Look at the next `n` bytes without consuming them. May return fewer
    /// only when the sentinel has already been consumed.
    pub fn peek(&mut self, n: usize) -> &[u8] {
        self.ensure(n);
        let end = n.min(self.buf.len());
        &self.buf[..end]
    }

    /// The next byte, or NUL at end of input.
    pub fn peek_char(&mut self) -> u8 {
        self.ensure(1);
        self.buf.first().copied().unwrap_or(0)
    }

    /// The byte `i` positions ahead, or NUL past end of input.
    pub fn peek_at(&mut self, i: usize) -> u8 {
        self.ensure(i + 1);
        self.buf.get(i).copied().unwrap_or(0)
    }

    /// Consume and return up to `n` bytes, updating the position. The NUL
    /// sentinel is never consumed.
    pub fn read(&mut self, n: usize) -> String {
        self.ensure(n);
        let mut end = n.min(self.buf.len());
        // Stop short of the EOF sentinel.
        if let Some(nul) = self.buf[..end].iter().position(|&b| b == 0) {
            end = nul;
        }
        let consumed: Vec<u8> = self.buf.drain(..end).collect();
        for &b in &consumed {
            self.pos.offset += 1;
            if b == b'\n' {
                self.pos.line += 1;
                self.pos.column = 1;
            } else {
                self.pos.column += 1;
            }
            self.echo(b);
        }
        String::from_utf8_lossy(&consumed).into_owned()
    }

    /// Consume and return the next byte, or NUL at end of input.
    pub fn read_char(&mut self) -> u8 {
        self.ensure(1);
        match self.buf.first().copied() {
            None | Some(0) => 0,
            Some(b) => {
                self.buf.remove(0);
                self.pos.offset += 1;
                if b == b'\n' {
                    self.pos.line += 1;
                    self.pos.column = 1;
                } else {
                    self.pos.column += 1;
                }
                self.echo(b);
                b
            }
        }
    }

    /// Replace the next `len` unread bytes with `replacement` in place.
    /// Used by alias substitution; positions of the spliced text are
    /// approximate by design.
    pub fn splice(&mut self, len: usize, replacement: &str) {
        self.ensure(len);
        let len = len.min(self.buf.len());
        self.buf.splice(..len, replacement.bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_read() {
        let mut cursor = SourceCursor::from_str("echo hi");
        assert_eq!(cursor.peek(4), b"echo");
        assert_eq!(cursor.peek_char(), b'e');
        assert_eq!(cursor.read(5), "echo ");
        assert_eq!(cursor.read_char(), b'h');
        assert_eq!(cursor.read_char(), b'i');
        assert_eq!(cursor.read_char(), 0);
        assert_eq!(cursor.read_char(), 0);
    }

    #[test]
    fn test_eof_sentinel_on_peek_past_end() {
        let mut cursor = SourceCursor::from_str("ab");
        let bytes = cursor.peek(5);
        assert_eq!(bytes, &[b'a', b'b', 0]);
    }

    #[test]
    fn test_position_tracking() {
        let mut cursor = SourceCursor::from_str("a\nbc");
        cursor.read_char();
        assert_eq!(cursor.pos().line, 1);
        assert_eq!(cursor.pos().column, 2);
        cursor.read_char();
        assert_eq!(cursor.pos().line, 2);
        assert_eq!(cursor.pos().column, 1);
        cursor.read(2);
        assert_eq!(cursor.pos().line, 2);
        assert_eq!(cursor.pos().column, 3);
        assert_eq!(cursor.pos().offset, 4);
    }

    #[test]
    fn test_read_never_consumes_sentinel() {
        let mut cursor = SourceCursor::from_str("ab");
        assert_eq!(cursor.read(10), "ab");
        assert_eq!(cursor.peek_char(), 0);
    }

    #[test]
    fn test_splice() {
        let mut cursor = SourceCursor::from_str("ll -a");
        cursor.splice(2, "ls -l");
        assert_eq!(cursor.read(8), "ls -l -a");
    }

    #[test]
    fn test_reader_refill() {
        let data = "x".repeat(3000);
        let mut cursor =
            SourceCursor::from_reader(Box::new(std::io::Cursor::new(data.clone())));
        assert_eq!(cursor.read(3000), data);
        assert_eq!(cursor.peek_char(), 0);
    }
}
