//! POSIX Process and Terminal Primitives
//!
//! Thin wrappers over libc used by the job, redirection and task code. All
//! fallible calls surface `io::Error` from errno; reads and writes retry on
//! EINTR. Every file the shell opens for itself carries CLOEXEC.

use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

pub use libc::{mode_t, pid_t};

/// Flush stdio before forking so buffered output is not duplicated into the
/// child.
pub fn flush_stdio() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

pub fn fork() -> io::Result<pid_t> {
    flush_stdio();
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(pid)
}

pub fn pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

pub fn close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

pub fn dup(fd: RawFd) -> io::Result<RawFd> {
    let new_fd = unsafe { libc::dup(fd) };
    if new_fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(new_fd)
}

pub fn dup2(old_fd: RawFd, new_fd: RawFd) -> io::Result<()> {
    if unsafe { libc::dup2(old_fd, new_fd) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn open(path: &str, flags: i32, mode: mode_t) -> io::Result<RawFd> {
    let path = CString::new(path)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NUL in filename"))?;
    let fd = unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(fd)
}

pub fn open_dev_null() -> io::Result<RawFd> {
    open("/dev/null", libc::O_CLOEXEC | libc::O_RDONLY, 0)
}

pub fn read_fd(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok(n as usize);
    }
}

pub fn write_fd(fd: RawFd, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        let n = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        buf = &buf[n as usize..];
    }
    Ok(())
}

/// Wait for a child. `pid` of -1 waits for any child; `untraced` also
/// reports stopped children. EINTR is retried.
pub fn waitpid(pid: pid_t, untraced: bool) -> io::Result<(pid_t, i32)> {
    let options = if untraced { libc::WUNTRACED } else { 0 };
    loop {
        let mut stat = 0;
        let ret = unsafe { libc::waitpid(pid, &mut stat, options) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok((ret, stat));
    }
}

pub fn kill(pid: pid_t, sig: i32) -> io::Result<()> {
    if unsafe { libc::kill(pid, sig) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn getpid() -> pid_t {
    unsafe { libc::getpid() }
}

pub fn getppid() -> pid_t {
    unsafe { libc::getppid() }
}

pub fn getpgrp() -> pid_t {
    unsafe { libc::getpgrp() }
}

pub fn getsid() -> pid_t {
    unsafe { libc::getsid(0) }
}

pub fn setpgid(pid: pid_t, pgid: pid_t) -> io::Result<()> {
    if unsafe { libc::setpgid(pid, pgid) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn isatty(fd: RawFd) -> bool {
    unsafe { libc::isatty(fd) == 1 }
}

pub fn tcgetpgrp(fd: RawFd) -> pid_t {
    unsafe { libc::tcgetpgrp(fd) }
}

pub fn tcsetpgrp(fd: RawFd, pgid: pid_t) -> io::Result<()> {
    if unsafe { libc::tcsetpgrp(fd, pgid) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn tcgetattr(fd: RawFd) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

/// Set terminal modes once pending output has drained.
pub fn tcsetattr(fd: RawFd, termios: &libc::termios) -> io::Result<()> {
    if unsafe { libc::tcsetattr(fd, libc::TCSADRAIN, termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn umask(mask: mode_t) -> mode_t {
    unsafe { libc::umask(mask) }
}

/// Replace the process image. Only returns on failure.
pub fn execv(path: &str, argv: &[String]) -> io::Error {
    let path = match CString::new(path) {
        Ok(path) => path,
        Err(_) => return io::Error::new(io::ErrorKind::InvalidInput, "NUL in path"),
    };
    let args: Vec<CString> = argv
        .iter()
        .map(|arg| CString::new(arg.as_str()).unwrap_or_default())
        .collect();
    let mut arg_ptrs: Vec<*const libc::c_char> =
        args.iter().map(|arg| arg.as_ptr()).collect();
    arg_ptrs.push(std::ptr::null());

    unsafe { libc::execv(path.as_ptr(), arg_ptrs.as_ptr()) };
    io::Error::last_os_error()
}

/// Home directory of a named user, for `~user` expansion.
pub fn getpwnam_dir(name: &str) -> Option<String> {
    let c_name = CString::new(name).ok()?;
    let pw = unsafe { libc::getpwnam(c_name.as_ptr()) };
    if pw.is_null() {
        return None;
    }
    let dir = unsafe { std::ffi::CStr::from_ptr((*pw).pw_dir) };
    Some(dir.to_string_lossy().into_owned())
}

pub fn setenv(name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (CString::new(name), CString::new(value)) {
        unsafe { libc::setenv(name.as_ptr(), value.as_ptr(), 1) };
    }
}

/// What to install for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    Default,
    Ignore,
    Catch,
}

/// The async-safe handler installed for caught signals; it must only touch
/// the pending counter array.
pub type SignalHandler = extern "C" fn(i32);

pub fn sigaction(
    sig: i32,
    disposition: SignalDisposition,
    handler: SignalHandler,
) -> io::Result<()> {
    let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
    sa.sa_sigaction = match disposition {
        SignalDisposition::Default => libc::SIG_DFL,
        SignalDisposition::Ignore => libc::SIG_IGN,
        SignalDisposition::Catch => handler as usize,
    };
    unsafe { libc::sigemptyset(&mut sa.sa_mask) };
    if unsafe { libc::sigaction(sig, &sa, std::ptr::null_mut()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
