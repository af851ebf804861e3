//! Redirection Engine
//!
//! Opens redirection targets and computes the file descriptor they apply
//! to. Here-documents become the read end of a pipe; if the body exceeds
//! PIPE_BUF a helper process finishes writing it. Builtins running in the
//! shell use `SavedFds` to dup the target descriptors aside and restore
//! them afterwards.

use std::os::unix::io::RawFd;

use crate::ast::{IoRedirect, IoRedirectOp, Word};
use crate::interp::Context;
use crate::shell::os;

/// One opened redirection: the source fd, the target it must be installed
/// as, and whether the source is shell-owned and closed after the dup.
/// A source of -1 means "close the target" (`<&-`, `>&-`).
pub struct RedirSource {
    pub fd: RawFd,
    pub target: RawFd,
    /// False for `<&`/`>&`, whose source is a live user descriptor.
    pub close_source: bool,
}

pub fn process_redir(ctx: &mut Context, redir: &IoRedirect) -> Result<RedirSource, ()> {
    let name = redir.name.str();

    let mut close_source = true;
    let (fd, default_target): (RawFd, RawFd) = match redir.op {
        IoRedirectOp::Less => {
            (open_checked(ctx, &name, libc::O_CLOEXEC | libc::O_RDONLY, 0)?, 0)
        }
        IoRedirectOp::Great => {
            let mut flags = libc::O_CLOEXEC | libc::O_WRONLY | libc::O_CREAT;
            // noclobber refuses to truncate an existing file; O_EXCL makes
            // the open itself fail instead.
            if ctx.state.options.noclobber {
                flags |= libc::O_EXCL;
            } else {
                flags |= libc::O_TRUNC;
            }
            (open_checked(ctx, &name, flags, 0o644)?, 1)
        }
        IoRedirectOp::Clobber => (
            open_checked(
                ctx,
                &name,
                libc::O_CLOEXEC | libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
                0o644,
            )?,
            1,
        ),
        IoRedirectOp::DGreat => (
            open_checked(
                ctx,
                &name,
                libc::O_CLOEXEC | libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
                0o644,
            )?,
            1,
        ),
        IoRedirectOp::LessGreat => (
            open_checked(
                ctx,
                &name,
                libc::O_CLOEXEC | libc::O_RDWR | libc::O_CREAT,
                0o644,
            )?,
            0,
        ),
        IoRedirectOp::LessAnd => {
            close_source = false;
            (parse_fd_operand(ctx, &name)?, 0)
        }
        IoRedirectOp::GreatAnd => {
            close_source = false;
            (parse_fd_operand(ctx, &name)?, 1)
        }
        IoRedirectOp::DLess | IoRedirectOp::DLessDash => {
            (here_document_fd(ctx, &redir.here_document)?, 0)
        }
    };

    let target = redir.io_number.unwrap_or(default_target);
    Ok(RedirSource { fd, target, close_source })
}

fn open_checked(ctx: &mut Context, name: &str, flags: i32, mode: u32) -> Result<RawFd, ()> {
    os::open(name, flags, mode as os::mode_t).map_err(|err| {
        eprintln!("{}: cannot open {}: {}", ctx.state.name(), name, err);
    })
}

/// `<&`/`>&` take a decimal fd, or `-` to close the target.
fn parse_fd_operand(ctx: &mut Context, name: &str) -> Result<RawFd, ()> {
    if name == "-" {
        return Ok(-1);
    }
    name.parse::<RawFd>().map_err(|_| {
        eprintln!("{}: invalid file descriptor '{}'", ctx.state.name(), name);
    })
}

/// Build the read end of a pipe holding the here-document body. Bodies that
/// fit in PIPE_BUF are written eagerly and the write end closed; larger
/// bodies are finished by a forked helper so the shell never blocks on its
/// own pipe.
fn here_document_fd(ctx: &mut Context, lines: &[Word]) -> Result<RawFd, ()> {
    let (read_end, write_end) = os::pipe().map_err(|err| {
        eprintln!("{}: pipe: {}", ctx.state.name(), err);
    })?;

    let mut remaining = libc::PIPE_BUF;
    let mut overflow_at = None;
    for (i, line) in lines.iter().enumerate() {
        let mut text = line.str();
        text.push('\n');
        if text.len() > remaining {
            overflow_at = Some(i);
            break;
        }
        remaining -= text.len();
        if write_here_line(ctx, write_end, &text).is_err() {
            os::close(read_end);
            os::close(write_end);
            return Err(());
        }
    }

    let Some(first_pending) = overflow_at else {
        os::close(write_end);
        return Ok(read_end);
    };

    match os::fork() {
        Ok(0) => {
            os::close(read_end);
            for line in &lines[first_pending..] {
                let mut text = line.str();
                text.push('\n');
                if write_here_line(ctx, write_end, &text).is_err() {
                    os::close(write_end);
                    std::process::exit(1);
                }
            }
            os::close(write_end);
            std::process::exit(0);
        }
        Ok(_) => {
            os::close(write_end);
            Ok(read_end)
        }
        Err(err) => {
            eprintln!("{}: fork: {}", ctx.state.name(), err);
            os::close(read_end);
            os::close(write_end);
            Err(())
        }
    }
}

fn write_here_line(ctx: &mut Context, fd: RawFd, text: &str) -> Result<(), ()> {
    os::write_fd(fd, text.as_bytes()).map_err(|err| {
        eprintln!("{}: write: {}", ctx.state.name(), err);
    })
}

/// Install a redirection in a child process: dup the source onto the target
/// and close shell-owned sources.
pub fn apply_redir_child(source: &RedirSource) -> Result<(), std::io::Error> {
    if source.fd < 0 {
        os::close(source.target);
        return Ok(());
    }
    if source.fd == source.target {
        return Ok(());
    }
    os::dup2(source.fd, source.target)?;
    if source.close_source {
        os::close(source.fd);
    }
    Ok(())
}

/// Saved descriptors for redirections applied in the shell itself, restored
/// after a builtin or function returns. Tolerates zero redirections.
pub struct SavedFds {
    saves: Vec<(Option<RawFd>, RawFd)>,
}

impl SavedFds {
    pub fn new() -> SavedFds {
        SavedFds { saves: Vec::new() }
    }

    /// Apply one redirection, saving the previous target descriptor.
    pub fn apply(&mut self, ctx: &mut Context, redir: &IoRedirect) -> Result<(), ()> {
        let source = process_redir(ctx, redir)?;
        let RedirSource { fd, target, close_source } = source;

        // A closed target fails the dup; restore then means close.
        let saved = os::dup(target).ok();
        self.saves.push((saved, target));

        if fd < 0 {
            os::close(target);
            return Ok(());
        }
        if fd != target {
            if let Err(err) = os::dup2(fd, target) {
                eprintln!(
                    "{}: cannot duplicate file descriptor: {}",
                    ctx.state.name(),
                    err
                );
                if close_source {
                    os::close(fd);
                }
                return Err(());
            }
            if close_source {
                os::close(fd);
            }
        }
        Ok(())
    }

    /// Keep the redirections installed: close the saved descriptors
    /// without putting them back. Used by `exec` without a command.
    pub fn commit(mut self) {
        while let Some((saved, _target)) = self.saves.pop() {
            if let Some(saved) = saved {
                os::close(saved);
            }
        }
    }

    /// Restore every saved descriptor, most recent first.
    pub fn restore(mut self) {
        os::flush_stdio();
        while let Some((saved, target)) = self.saves.pop() {
            match saved {
                Some(saved) => {
                    let _ = os::dup2(saved, target);
                    os::close(saved);
                }
                None => os::close(target),
            }
        }
    }
}

impl Default for SavedFds {
    fn default() -> SavedFds {
        SavedFds::new()
    }
}
