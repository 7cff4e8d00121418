//! Colored user-facing messages.
//!
//! Prefixed messages go to stderr; stdout is reserved for command output
//! (`print_user`). Colors are enabled only when stderr is a TTY.

use owo_colors::OwoColorize;

fn is_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "info:".cyan().bold(), msg);
    } else {
        eprintln!("info: {msg}");
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {msg}");
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {msg}");
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "ok:".green().bold(), msg);
    } else {
        eprintln!("ok: {msg}");
    }
}

/// Print a plain line on stdout (no prefix), such as one listed path.
pub fn print_user(msg: &str) {
    println!("{msg}");
}
