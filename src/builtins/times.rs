//! `times`: print accumulated user and system times for the shell and its
//! children.

use crate::interp::{Context, TaskStatus};

fn format_clock(ticks: libc::clock_t, ticks_per_sec: i64) -> String {
    let total = ticks as f64 / ticks_per_sec as f64;
    let minutes = (total / 60.0) as i64;
    let seconds = total - (minutes as f64) * 60.0;
    format!("{}m{:.6}s", minutes, seconds)
}

pub fn builtin_times(ctx: &mut Context, _argv: &[String]) -> TaskStatus {
    let mut tms: libc::tms = unsafe { std::mem::zeroed() };
    if unsafe { libc::times(&mut tms) } == (-1i64) as libc::clock_t {
        eprintln!("{}: times: {}", ctx.state.name(), std::io::Error::last_os_error());
        return TaskStatus::Exit(1);
    }
    let ticks_per_sec = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks_per_sec <= 0 {
        eprintln!("{}: times: cannot determine clock tick rate", ctx.state.name());
        return TaskStatus::Exit(1);
    }

    println!(
        "{} {}",
        format_clock(tms.tms_utime, ticks_per_sec),
        format_clock(tms.tms_stime, ticks_per_sec)
    );
    println!(
        "{} {}",
        format_clock(tms.tms_cutime, ticks_per_sec),
        format_clock(tms.tms_cstime, ticks_per_sec)
    );
    TaskStatus::Exit(0)
}
