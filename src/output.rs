//! Status reporting for the command line. Everything goes to stderr, so stdout carries
//! only what the program itself prints.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::Path;

use colored::Colorize;

use crate::registers::Registers;

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Red,
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

/// Right-aligned coloured status word followed by a description.
pub fn message(color: MsgColor, left: &str, right: &str) {
    if is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

pub fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

/// Register dump. Printed even when minimal, in a plain line-per-register form.
pub fn print_registers(regs: &Registers) {
    eprint!("{}", format_registers(regs, is_minimal()));
}

pub fn format_registers(regs: &Registers, minimal: bool) -> String {
    let mut out = String::new();
    if minimal {
        for (reg, val) in regs.iter() {
            let _ = writeln!(out, "{} {}", reg, val);
        }
        let _ = writeln!(out, "PC {}", regs.pc());
        let _ = writeln!(out, "CC {:03b}", regs.flag().bits());
        return out;
    }

    let _ = writeln!(out, "\x1b[2m┌────────────────────────────────┐\x1b[0m");
    let _ = writeln!(
        out,
        "\x1b[2m│        \x1b[3mhex     int    uint\x1b[0m\x1b[2m     │\x1b[0m"
    );
    for (reg, val) in regs.iter() {
        let _ = writeln!(
            out,
            "\x1b[2m│\x1b[0m \x1b[1m{}\x1b[0m  0x{:04x}  {:-6}  {:-6}  \x1b[2m│\x1b[0m",
            reg, val, val as i16, val
        );
    }
    let _ = writeln!(
        out,
        "\x1b[2m│\x1b[0m \x1b[1mPC\x1b[0m  0x{:04x}   \x1b[1mCC\x1b[0m  {:<8}      \x1b[2m│\x1b[0m",
        regs.pc(),
        regs.flag().to_string()
    );
    let _ = writeln!(out, "\x1b[2m└────────────────────────────────┘\x1b[0m");
    out
}
