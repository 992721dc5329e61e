/// Plain line-oriented console output for the REPL.
use crossterm::{cursor, execute, style, ExecutableCommand};
use std::io::{self, Write};

pub const NAME: &str = env!("CARGO_PKG_NAME");

pub fn print_prompt() -> io::Result<()> {
    io::stdout()
        .execute(style::SetAttribute(style::Attribute::Bold))?
        .execute(style::Print(format!("{}> ", NAME)))?
        .execute(style::SetAttribute(style::Attribute::Reset))?;
    io::stdout().flush()
}

pub fn echo(s: String) {
    let _ = execute!(io::stdout(), cursor::MoveToNextLine(0), style::Print(s));
    let _ = io::stdout().flush();
}

pub fn echo_error(s: String) {
    let _ = execute!(
        io::stdout(),
        cursor::MoveToNextLine(0),
        style::SetForegroundColor(style::Color::Red),
        style::Print(s),
        style::ResetColor
    );
    let _ = io::stdout().flush();
}

pub fn echo_lines(s: String) {
    for l in s.lines() {
        let _ = execute!(io::stdout(), cursor::MoveToNextLine(0), style::Print(l));
    }
    let _ = io::stdout().flush();
}

#[macro_export]
macro_rules! echo {
    ($($arg:tt)*) => {
        crate::console::echo(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! echo_error {
    ($($arg:tt)*) => {
        crate::console::echo_error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! echo_lines {
    ($($arg:tt)*) => {
        crate::console::echo_lines(format!($($arg)*))
    };
}
